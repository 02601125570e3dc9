use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::models::{Payment, Reservation, User};

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn welcome(user: &User) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Welcome to the venue marketplace".to_string(),
            body: format!(
                "Hi {},\n\nYour account is ready. You can now search venues and make reservations.",
                user.name
            ),
        }
    }

    pub fn payment_instructions(user: &User, reservation: &Reservation, payment: &Payment) -> Self {
        Self {
            to: user.email.clone(),
            subject: format!("Complete the payment for reservation {}", reservation.id),
            body: format!(
                "Hi {},\n\nYour reservation from {} to {} is waiting for payment.\n\
                 Method: {}\nPayment code: {}\nTotal: {}\n",
                user.name,
                reservation.check_in.to_rfc3339(),
                reservation.check_out.to_rfc3339(),
                payment.payment_method,
                payment.payment_code,
                payment.grand_total
            ),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Logs outgoing mail instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Sending email");
        Ok(())
    }
}
