use serde::Serialize;
use shared::PaymentMethod;

/// What the booking side asks the gateway to collect.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeOrder {
    pub order_id: String,
    pub gross_amount: i64,
    pub method: PaymentMethod,
    pub customer: Option<CustomerDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankTransfer {
    pub bank: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EChannel {
    pub bill_info1: String,
    pub bill_info2: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CStore {
    pub store: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoPay {
    pub enable_callback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShopeePay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Qris {
    pub acquirer: String,
}

/// Body of `POST /v2/charge`. Exactly one of the method sections is set,
/// matching `payment_type`.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub payment_type: &'static str,
    pub transaction_details: TransactionDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<CustomerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_transfer: Option<BankTransfer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echannel: Option<EChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cstore: Option<CStore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gopay: Option<GoPay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopeepay: Option<ShopeePay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qris: Option<Qris>,
}

impl ChargeRequest {
    pub fn new(order: &ChargeOrder, callback_url: Option<&str>) -> Self {
        let callback_url = callback_url.map(str::to_string);

        match order.method {
            PaymentMethod::Bri | PaymentMethod::Bca | PaymentMethod::Bni | PaymentMethod::Permata => Self {
                bank_transfer: Some(BankTransfer {
                    bank: order.method.as_str().to_string(),
                }),
                ..Self::base("bank_transfer", order)
            },
            PaymentMethod::Mandiri => Self {
                echannel: Some(EChannel {
                    bill_info1: "Payment:".to_string(),
                    bill_info2: "Venue reservation".to_string(),
                }),
                ..Self::base("echannel", order)
            },
            PaymentMethod::Indomaret | PaymentMethod::Alfamart => Self {
                cstore: Some(CStore {
                    store: order.method.as_str().to_string(),
                    message: format!("Venue reservation {}", order.order_id),
                }),
                ..Self::base("cstore", order)
            },
            PaymentMethod::Gopay => Self {
                gopay: Some(GoPay {
                    enable_callback: callback_url.is_some(),
                    callback_url,
                }),
                ..Self::base("gopay", order)
            },
            PaymentMethod::Shopeepay => Self {
                shopeepay: Some(ShopeePay { callback_url }),
                ..Self::base("shopeepay", order)
            },
            PaymentMethod::Qris => Self {
                qris: Some(Qris {
                    acquirer: "gopay".to_string(),
                }),
                ..Self::base("qris", order)
            },
        }
    }

    fn base(payment_type: &'static str, order: &ChargeOrder) -> Self {
        Self {
            payment_type,
            transaction_details: TransactionDetails {
                order_id: order.order_id.clone(),
                gross_amount: order.gross_amount,
            },
            customer_details: order.customer.clone(),
            bank_transfer: None,
            echannel: None,
            cstore: None,
            gopay: None,
            shopeepay: None,
            qris: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub refund_key: String,
    pub amount: i64,
    pub reason: String,
}

impl RefundRequest {
    pub fn new(order_id: &str, amount: i64, reason: &str) -> Self {
        Self {
            refund_key: format!("{order_id}-refund"),
            amount,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(method: PaymentMethod) -> ChargeOrder {
        ChargeOrder {
            order_id: "order-1".to_string(),
            gross_amount: 100_000,
            method,
            customer: None,
        }
    }

    #[test]
    fn bank_methods_use_bank_transfer() {
        for method in [PaymentMethod::Bri, PaymentMethod::Bca, PaymentMethod::Bni, PaymentMethod::Permata] {
            let body = serde_json::to_value(ChargeRequest::new(&order(method), None)).unwrap();
            assert_eq!(body["payment_type"], "bank_transfer");
            assert_eq!(body["bank_transfer"]["bank"], method.as_str());
            assert_eq!(body["transaction_details"], json!({"order_id": "order-1", "gross_amount": 100000}));
            assert!(body.get("echannel").is_none());
        }
    }

    #[test]
    fn mandiri_uses_echannel_shape() {
        let body = serde_json::to_value(ChargeRequest::new(&order(PaymentMethod::Mandiri), None)).unwrap();
        assert_eq!(body["payment_type"], "echannel");
        assert!(body.get("bank_transfer").is_none());
        assert_eq!(body["echannel"]["bill_info1"], "Payment:");
    }

    #[test]
    fn convenience_stores_use_cstore() {
        let body = serde_json::to_value(ChargeRequest::new(&order(PaymentMethod::Alfamart), None)).unwrap();
        assert_eq!(body["payment_type"], "cstore");
        assert_eq!(body["cstore"]["store"], "alfamart");
    }

    #[test]
    fn ewallets_carry_callback_url() {
        let body = serde_json::to_value(ChargeRequest::new(
            &order(PaymentMethod::Gopay),
            Some("https://venues.example/finish"),
        ))
        .unwrap();
        assert_eq!(body["payment_type"], "gopay");
        assert_eq!(body["gopay"], json!({"enable_callback": true, "callback_url": "https://venues.example/finish"}));

        let body = serde_json::to_value(ChargeRequest::new(&order(PaymentMethod::Shopeepay), None)).unwrap();
        assert_eq!(body["payment_type"], "shopeepay");
        assert_eq!(body["shopeepay"], json!({}));
    }

    #[test]
    fn qris_is_acquired_by_gopay() {
        let body = serde_json::to_value(ChargeRequest::new(&order(PaymentMethod::Qris), None)).unwrap();
        assert_eq!(body["payment_type"], "qris");
        assert_eq!(body["qris"]["acquirer"], "gopay");
    }

    #[test]
    fn refund_key_is_derived_from_order() {
        let refund = RefundRequest::new("order-1", 50_000, "changed plans");
        assert_eq!(refund.refund_key, "order-1-refund");
        assert_eq!(refund.amount, 50_000);
    }
}
