use shared::PaymentMethod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment gateway rejected request ({status_code}): {message}")]
    Rejected { status_code: String, message: String },

    #[error("failed to decode payment gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payment gateway returned no payment code for {0}")]
    MissingPaymentCode(PaymentMethod),
}
