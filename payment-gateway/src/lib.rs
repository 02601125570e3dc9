//! Client for the payment gateway's Core API: charges, refunds, cancellations
//! and verification of the status notifications it pushes back.

mod client;
mod error;
mod request;
mod response;
mod signature;

pub use client::{GatewayConfig, MidtransClient, PaymentGateway};
#[cfg(any(test, feature = "mock"))]
pub use client::MockPaymentGateway;
pub use error::GatewayError;
pub use request::{ChargeOrder, ChargeRequest, CustomerDetails, RefundRequest};
pub use response::{Action, ChargeResponse, RefundResponse, VaNumber};
pub use signature::{notification_signature, verify_signature};
