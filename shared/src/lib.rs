use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid payment_type")]
pub struct InvalidPaymentType(pub String);

/// Payment methods the marketplace accepts at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Bri,
    Bca,
    Bni,
    Mandiri,
    Permata,
    Indomaret,
    Alfamart,
    Gopay,
    Shopeepay,
    Qris,
}

/// How the gateway collects money for a method. Decides both the charge
/// request shape and where the payment code is found in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentChannel {
    BankTransfer,
    EChannel,
    ConvenienceStore,
    EWallet,
    Qris,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 10] = [
        PaymentMethod::Bri,
        PaymentMethod::Bca,
        PaymentMethod::Bni,
        PaymentMethod::Mandiri,
        PaymentMethod::Permata,
        PaymentMethod::Indomaret,
        PaymentMethod::Alfamart,
        PaymentMethod::Gopay,
        PaymentMethod::Shopeepay,
        PaymentMethod::Qris,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Bri => "bri",
            PaymentMethod::Bca => "bca",
            PaymentMethod::Bni => "bni",
            PaymentMethod::Mandiri => "mandiri",
            PaymentMethod::Permata => "permata",
            PaymentMethod::Indomaret => "indomaret",
            PaymentMethod::Alfamart => "alfamart",
            PaymentMethod::Gopay => "gopay",
            PaymentMethod::Shopeepay => "shopeepay",
            PaymentMethod::Qris => "qris",
        }
    }

    pub fn channel(&self) -> PaymentChannel {
        match self {
            PaymentMethod::Bri | PaymentMethod::Bca | PaymentMethod::Bni | PaymentMethod::Permata => {
                PaymentChannel::BankTransfer
            }
            PaymentMethod::Mandiri => PaymentChannel::EChannel,
            PaymentMethod::Indomaret | PaymentMethod::Alfamart => PaymentChannel::ConvenienceStore,
            PaymentMethod::Gopay | PaymentMethod::Shopeepay => PaymentChannel::EWallet,
            PaymentMethod::Qris => PaymentChannel::Qris,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = InvalidPaymentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == wanted)
            .ok_or_else(|| InvalidPaymentType(s.to_string()))
    }
}

/// Transaction status as reported by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Authorize,
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
    Failure,
    Refund,
    PartialRefund,
    Chargeback,
    PartialChargeback,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Authorize => "authorize",
            TransactionStatus::Capture => "capture",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Failure => "failure",
            TransactionStatus::Refund => "refund",
            TransactionStatus::PartialRefund => "partial_refund",
            TransactionStatus::Chargeback => "chargeback",
            TransactionStatus::PartialChargeback => "partial_chargeback",
        }
    }

    /// Statuses that require the customer's money to be returned.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TransactionStatus::Cancel)
    }

    /// The status string persisted on the payment row.
    pub fn stored_status(&self) -> &'static str {
        match self {
            TransactionStatus::Settlement => "success",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status notification pushed by the gateway to the callback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub transaction_id: String,
    pub order_id: String,
    pub transaction_status: TransactionStatus,
    pub payment_type: String,
    pub gross_amount: String,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub signature_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: PageRequest, total_items: i64) -> Self {
        let limit = i64::from(page.limit);
        let total_pages = if total_items <= 0 { 0 } else { (total_items + limit - 1) / limit };
        Self {
            page: page.page,
            limit: page.limit,
            total_items,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// JSON envelope returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn success(code: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(message: impl Into<String>, data: T, pagination: Pagination) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}
