use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::request::{ChargeOrder, ChargeRequest, RefundRequest};
use crate::response::{ChargeResponse, RefundResponse};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub server_key: String,
    pub timeout: Duration,
    /// Where e-wallet apps send the customer after paying.
    pub callback_url: Option<String>,
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, order: ChargeOrder) -> Result<ChargeResponse, GatewayError>;

    async fn refund(&self, order_id: String, amount: i64, reason: String) -> Result<RefundResponse, GatewayError>;

    async fn cancel(&self, order_id: String) -> Result<ChargeResponse, GatewayError>;
}

pub struct MidtransClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl MidtransClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    async fn post<R: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<R, GatewayError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self
            .http
            .post(&url)
            .basic_auth(&self.config.server_key, None::<&str>)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let http_status = response.status();
        let text = response.text().await?;

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) if !http_status.is_success() => {
                return Err(GatewayError::Rejected {
                    status_code: http_status.as_u16().to_string(),
                    message: text,
                })
            }
            Err(e) => return Err(e.into()),
        };

        // The gateway reports failures in the body, often with HTTP 200.
        let status_code = value
            .get("status_code")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| http_status.as_u16().to_string());
        if !http_status.is_success() || !status_code.starts_with('2') {
            let message = value
                .get("status_message")
                .and_then(Value::as_str)
                .unwrap_or("unknown gateway error")
                .to_string();
            warn!("Gateway rejected {} with {}: {}", path, status_code, message);
            return Err(GatewayError::Rejected { status_code, message });
        }

        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl PaymentGateway for MidtransClient {
    async fn charge(&self, order: ChargeOrder) -> Result<ChargeResponse, GatewayError> {
        let request = ChargeRequest::new(&order, self.config.callback_url.as_deref());
        let body = serde_json::to_value(&request)?;
        let response: ChargeResponse = self.post("/v2/charge", Some(body)).await?;
        info!(
            "Charged order {} via {}: transaction {} is {}",
            order.order_id,
            order.method,
            response.transaction_id,
            response.transaction_status.as_deref().unwrap_or("unknown")
        );
        Ok(response)
    }

    async fn refund(&self, order_id: String, amount: i64, reason: String) -> Result<RefundResponse, GatewayError> {
        let body = serde_json::to_value(RefundRequest::new(&order_id, amount, &reason))?;
        let response: RefundResponse = self.post(&format!("/v2/{order_id}/refund"), Some(body)).await?;
        info!("Refunded {} for order {}", amount, order_id);
        Ok(response)
    }

    async fn cancel(&self, order_id: String) -> Result<ChargeResponse, GatewayError> {
        let response: ChargeResponse = self.post(&format!("/v2/{order_id}/cancel"), None).await?;
        info!("Cancelled charge for order {}", order_id);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use shared::PaymentMethod;

    const AUTH: &str = "Basic U0ItTWlkLXNlcnZlci10ZXN0Og==";

    fn client(server: &MockServer) -> MidtransClient {
        MidtransClient::new(GatewayConfig {
            base_url: server.base_url(),
            server_key: "SB-Mid-server-test".to_string(),
            timeout: Duration::from_secs(5),
            callback_url: None,
        })
        .unwrap()
    }

    fn order(method: PaymentMethod) -> ChargeOrder {
        ChargeOrder {
            order_id: "order-1".to_string(),
            gross_amount: 100_000,
            method,
            customer: None,
        }
    }

    #[tokio::test]
    async fn charges_gopay_and_exposes_action_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/charge")
                    .header("authorization", AUTH)
                    .json_body_partial(r#"{"payment_type":"gopay","transaction_details":{"order_id":"order-1","gross_amount":100000}}"#);
                then.status(200).json_body(json!({
                    "status_code": "201",
                    "status_message": "GoPay transaction is created",
                    "transaction_id": "trx-1",
                    "order_id": "order-1",
                    "gross_amount": "100000.00",
                    "payment_type": "gopay",
                    "transaction_status": "pending",
                    "actions": [{"name": "generate-qr-code", "method": "GET", "url": "https://gateway.test/qr/trx-1"}]
                }));
            })
            .await;

        let response = client(&server).charge(order(PaymentMethod::Gopay)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.transaction_id, "trx-1");
        assert_eq!(response.payment_code(PaymentMethod::Gopay).unwrap(), "https://gateway.test/qr/trx-1");
    }

    #[tokio::test]
    async fn body_status_code_failure_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/charge");
                then.status(200).json_body(json!({
                    "status_code": "406",
                    "status_message": "The request could not be completed due to a conflict"
                }));
            })
            .await;

        let err = client(&server).charge(order(PaymentMethod::Bca)).await.unwrap_err();

        match err {
            GatewayError::Rejected { status_code, message } => {
                assert_eq!(status_code, "406");
                assert!(message.contains("conflict"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_page_is_rejected_with_http_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/charge");
                then.status(502).body("Bad Gateway");
            })
            .await;

        let err = client(&server).charge(order(PaymentMethod::Bri)).await.unwrap_err();

        assert!(matches!(err, GatewayError::Rejected { ref status_code, .. } if status_code == "502"));
    }

    #[tokio::test]
    async fn refunds_with_amount_and_reason() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/order-1/refund")
                    .json_body(json!({"refund_key": "order-1-refund", "amount": 75000, "reason": "cancelled"}));
                then.status(200).json_body(json!({
                    "status_code": "200",
                    "status_message": "Success, refund request is approved",
                    "transaction_id": "trx-1",
                    "order_id": "order-1",
                    "refund_amount": "75000.00",
                    "refund_key": "order-1-refund",
                    "transaction_status": "refund"
                }));
            })
            .await;

        let response = client(&server)
            .refund("order-1".to_string(), 75_000, "cancelled".to_string())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.transaction_status.as_deref(), Some("refund"));
    }

    #[tokio::test]
    async fn cancel_posts_without_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/order-1/cancel");
                then.status(200).json_body(json!({
                    "status_code": "200",
                    "transaction_id": "trx-1",
                    "order_id": "order-1",
                    "transaction_status": "cancel"
                }));
            })
            .await;

        let response = client(&server).cancel("order-1".to_string()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.transaction_status.as_deref(), Some("cancel"));
    }
}
