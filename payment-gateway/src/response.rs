use serde::{Deserialize, Serialize};
use shared::{PaymentChannel, PaymentMethod};

use crate::error::GatewayError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaNumber {
    pub bank: String,
    pub va_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub method: String,
    pub url: String,
}

/// Charge result. Which code fields are filled depends on the payment type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub status_code: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub gross_amount: String,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<String>,
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    #[serde(default)]
    pub permata_va_number: Option<String>,
    #[serde(default)]
    pub bill_key: Option<String>,
    #[serde(default)]
    pub biller_code: Option<String>,
    #[serde(default, rename = "payment_code")]
    pub store_payment_code: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ChargeResponse {
    /// The code the customer pays with: a VA number, a biller/bill-key pair,
    /// a convenience store code, or the deeplink/QR URL of an e-wallet.
    pub fn payment_code(&self, method: PaymentMethod) -> Result<String, GatewayError> {
        let code = match method.channel() {
            PaymentChannel::BankTransfer | PaymentChannel::EChannel => self.bank_code(),
            PaymentChannel::ConvenienceStore => non_empty(self.store_payment_code.as_deref()),
            PaymentChannel::EWallet | PaymentChannel::Qris => {
                self.actions.first().and_then(|action| non_empty(Some(action.url.as_str())))
            }
        };
        code.ok_or(GatewayError::MissingPaymentCode(method))
    }

    fn bank_code(&self) -> Option<String> {
        if let Some(permata) = non_empty(self.permata_va_number.as_deref()) {
            return Some(permata);
        }
        if let (Some(biller), Some(key)) = (
            non_empty(self.biller_code.as_deref()),
            non_empty(self.bill_key.as_deref()),
        ) {
            return Some(format!("{biller} {key}"));
        }
        self.va_numbers
            .first()
            .and_then(|va| non_empty(Some(va.va_number.as_str())))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundResponse {
    pub status_code: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub refund_amount: Option<String>,
    #[serde(default)]
    pub refund_key: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<String>,
}
