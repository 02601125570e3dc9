use sha2::{Digest, Sha512};
use shared::PaymentNotification;

/// `sha512(order_id + status_code + gross_amount + server_key)`, hex encoded.
pub fn notification_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_signature(notification: &PaymentNotification, server_key: &str) -> bool {
    let (Some(status_code), Some(signature)) = (&notification.status_code, &notification.signature_key) else {
        return false;
    };
    let expected = notification_signature(&notification.order_id, status_code, &notification.gross_amount, server_key);
    expected.eq_ignore_ascii_case(signature)
}
