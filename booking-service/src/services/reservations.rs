use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use num_traits::ToPrimitive;
use payment_gateway::{ChargeOrder, CustomerDetails, PaymentGateway};
use serde::Deserialize;
use shared::{PageRequest, Pagination, PaymentMethod, TransactionStatus};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::mailer::{Email, Mailer};
use crate::models::{NewPayment, NewReservation, Payment, Reservation, ReservationDetail, ReservationSummary};
use crate::repository::{ReservationRepository, UserRepository, VenueRepository};

const REFUND_REASON: &str = "reservation cancelled by customer";

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationInput {
    #[serde(default)]
    pub venue_id: String,
    #[serde(default)]
    pub check_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub grand_total: Option<String>,
}

/// A gateway status change for one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentUpdate {
    pub transaction_id: String,
    pub reservation_id: Uuid,
    pub status: TransactionStatus,
    pub payment_type: String,
    pub grand_total: String,
}

/// Price of a time slot at a venue.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Whole hours, rounded up.
    pub duration: i32,
    pub subtotal: BigDecimal,
    pub grand_total: String,
    /// Amount sent to the gateway, which only takes whole currency units.
    pub gross_amount: i64,
}

impl Quote {
    pub fn new(price: &BigDecimal, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> AppResult<Self> {
        let seconds = (check_out - check_in).num_seconds();
        let hours = ((seconds + 3599) / 3600).max(1);
        let duration = i32::try_from(hours).map_err(|_| AppError::validation("reservation is too long"))?;

        let subtotal = price * BigDecimal::from(duration);
        let gross_amount = subtotal
            .round(0)
            .to_i64()
            .ok_or_else(|| AppError::validation("grand total is out of range"))?;

        Ok(Self {
            duration,
            grand_total: subtotal.with_scale(2).to_string(),
            subtotal,
            gross_amount,
        })
    }

    /// Checks a client-side total against the venue price.
    pub fn confirm(&self, claimed: Option<&str>) -> AppResult<()> {
        let Some(claimed) = claimed else {
            return Ok(());
        };
        let claimed =
            BigDecimal::from_str(claimed.trim()).map_err(|_| AppError::validation("failed to parse grand_total"))?;
        if claimed != self.subtotal {
            return Err(AppError::validation("grand_total does not match venue price"));
        }
        Ok(())
    }
}

struct ValidatedReservation {
    venue_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    method: PaymentMethod,
}

fn validate(reservation: &ReservationInput, payment: &PaymentInput, now: DateTime<Utc>) -> AppResult<ValidatedReservation> {
    let venue_id = reservation.venue_id.trim();
    if venue_id.is_empty() {
        return Err(AppError::validation("venue_id is required"));
    }
    let venue_id = Uuid::parse_str(venue_id).map_err(|_| AppError::validation("venue_id must be a valid UUID"))?;

    let check_in = reservation
        .check_in
        .ok_or_else(|| AppError::validation("check_in is required"))?;
    let check_out = reservation
        .check_out
        .ok_or_else(|| AppError::validation("check_out is required"))?;
    if check_out <= check_in {
        return Err(AppError::validation("check_out must be after check_in"));
    }
    if check_in < now {
        return Err(AppError::validation("check_in must not be in the past"));
    }

    let method = payment
        .payment_type
        .parse::<PaymentMethod>()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    Ok(ValidatedReservation {
        venue_id,
        check_in,
        check_out,
        method,
    })
}

pub struct ReservationService {
    reservations: Arc<dyn ReservationRepository>,
    venues: Arc<dyn VenueRepository>,
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn Mailer>,
}

impl ReservationService {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        venues: Arc<dyn VenueRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            reservations,
            venues,
            users,
            gateway,
            mailer,
        }
    }

    /// Books a slot and charges for it. The slot is held by a short
    /// serializable transaction before the charge and linked to the payment
    /// by a second one after it; a failed charge releases the slot.
    pub async fn make_reservation(
        &self,
        user_id: Uuid,
        reservation: ReservationInput,
        payment: PaymentInput,
    ) -> AppResult<(Reservation, Payment)> {
        let input = validate(&reservation, &payment, Utc::now())?;

        let price = self
            .venues
            .price(input.venue_id)
            .await?
            .ok_or_else(|| AppError::not_found("venue not found"))?;
        let quote = Quote::new(&price, input.check_in, input.check_out)?;
        quote.confirm(payment.grand_total.as_deref())?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        let mut reservation = self
            .reservations
            .create_if_available(NewReservation {
                id: Uuid::new_v4(),
                user_id,
                venue_id: input.venue_id,
                check_in: input.check_in,
                check_out: input.check_out,
                duration: quote.duration,
                subtotal: quote.subtotal.clone(),
            })
            .await?
            .ok_or_else(|| {
                warn!("Venue {} is taken between {} and {}", input.venue_id, input.check_in, input.check_out);
                AppError::Conflict("reservation not available".to_string())
            })?;
        info!("Holding reservation {} for user {}", reservation.id, user_id);

        let order = ChargeOrder {
            order_id: reservation.id.to_string(),
            gross_amount: quote.gross_amount,
            method: input.method,
            customer: Some(CustomerDetails {
                first_name: user.name.clone(),
                email: user.email.clone(),
                phone: user.phone.clone(),
            }),
        };
        let charge = match self.gateway.charge(order).await {
            Ok(charge) => charge,
            Err(e) => {
                warn!("Charge for reservation {} failed: {}", reservation.id, e);
                self.release(reservation.id, false).await;
                return Err(AppError::Upstream(e.to_string()));
            }
        };
        if charge.transaction_id.trim().is_empty() {
            self.release(reservation.id, true).await;
            return Err(AppError::Upstream("gateway returned no transaction id".to_string()));
        }

        let payment_code = match charge.payment_code(input.method) {
            Ok(code) => code,
            Err(e) => {
                warn!("Charge {} has no usable payment code: {}", charge.transaction_id, e);
                self.release(reservation.id, true).await;
                return Err(AppError::Upstream(e.to_string()));
            }
        };

        let new_payment = NewPayment {
            id: charge.transaction_id.clone(),
            reservation_id: reservation.id,
            payment_method: input.method.as_str().to_string(),
            payment_code,
            grand_total: quote.grand_total.clone(),
            status: charge
                .transaction_status
                .clone()
                .unwrap_or_else(|| TransactionStatus::Pending.as_str().to_string()),
        };
        let payment = match self.reservations.attach_payment(new_payment).await {
            Ok(payment) => payment,
            Err(e) => {
                error!("Failed to store payment {} for reservation {}: {:#}", charge.transaction_id, reservation.id, e);
                self.release(reservation.id, true).await;
                return Err(AppError::Internal(format!("failed to store payment: {e:#}")));
            }
        };
        reservation.payment_id = Some(payment.id.clone());
        info!(
            "Reservation {} charged via {} as transaction {}",
            reservation.id, payment.payment_method, payment.id
        );

        if let Err(e) = self
            .mailer
            .send(Email::payment_instructions(&user, &reservation, &payment))
            .await
        {
            warn!("Failed to send payment instructions for reservation {}: {:#}", reservation.id, e);
        }

        Ok((reservation, payment))
    }

    /// Applies a gateway status change. Cancellations are refunded unless the
    /// booking ends within the hour.
    pub async fn reservation_status(&self, update: PaymentUpdate) -> AppResult<Payment> {
        let amount = update
            .grand_total
            .trim()
            .parse::<f64>()
            .map_err(|e| AppError::Validation(format!("failed to parse grand total: {e}")))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::Validation(format!(
                "failed to parse grand total: {} is not a valid amount",
                update.grand_total
            )));
        }
        // The gateway refunds whole currency units.
        let refund_amount = amount.trunc().to_i64().ok_or_else(|| {
            AppError::Validation(format!(
                "failed to parse grand total: {} is out of range",
                update.grand_total
            ))
        })?;

        if update.status.is_cancellation() {
            let check_out = self
                .reservations
                .checkout_date(update.reservation_id)
                .await
                .map_err(|e| AppError::Internal(format!("failed to get checkout date: {e:#}")))?
                .ok_or_else(|| AppError::not_found("reservation not found"))?;

            if check_out - Utc::now() < Duration::hours(1) {
                warn!("Refused refund for reservation {} ending at {}", update.reservation_id, check_out);
                return Err(AppError::validation("refund cannot be processed at least 1 hour away"));
            }

            let refund = self
                .gateway
                .refund(update.reservation_id.to_string(), refund_amount, REFUND_REASON.to_string())
                .await
                .map_err(|e| AppError::Upstream(format!("failed to refund transaction: {e}")))?;
            info!(
                "Refunded reservation {} ({})",
                update.reservation_id,
                refund.refund_amount.as_deref().unwrap_or("full amount")
            );
        }

        let status = update.status.stored_status();
        let payment = self
            .reservations
            .update_payment_status(update.transaction_id.clone(), status.to_string())
            .await
            .map_err(|e| match update.status {
                TransactionStatus::Expire => AppError::Internal(format!("error on updating status to expire: {e:#}")),
                _ => AppError::Internal(format!("failed to update payment status: {e:#}")),
            })?
            .ok_or_else(|| AppError::not_found("payment not found"))?;

        info!(
            "Payment {} ({}) for reservation {} is now {}",
            payment.id, update.payment_type, update.reservation_id, payment.status
        );
        Ok(payment)
    }

    pub async fn reservation_history(&self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<ReservationSummary>, Pagination)> {
        let (history, total) = self.reservations.history(user_id, page).await?;
        Ok((history, Pagination::new(page, total)))
    }

    pub async fn transaction_detail(&self, user_id: Uuid, reservation_id: Uuid) -> AppResult<ReservationDetail> {
        self.reservations
            .find_detail(reservation_id)
            .await?
            .filter(|detail| detail.reservation.user_id == user_id)
            .ok_or_else(|| AppError::not_found("reservation not found"))
    }

    /// Frees the slot of a reservation whose payment could not be completed,
    /// voiding the charge first when one was made.
    async fn release(&self, reservation_id: Uuid, charged: bool) {
        if charged {
            if let Err(e) = self.gateway.cancel(reservation_id.to_string()).await {
                error!("Failed to cancel charge for reservation {}: {}", reservation_id, e);
            }
        }
        if let Err(e) = self.reservations.discard(reservation_id).await {
            error!("Failed to discard reservation {}: {:#}", reservation_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockMailer;
    use crate::models::User;
    use crate::repository::{MockReservationRepository, MockUserRepository, MockVenueRepository};
    use mockall::predicate::*;
    use payment_gateway::{Action, ChargeResponse, GatewayError, MockPaymentGateway, RefundResponse};

    struct Mocks {
        reservations: MockReservationRepository,
        venues: MockVenueRepository,
        users: MockUserRepository,
        gateway: MockPaymentGateway,
        mailer: MockMailer,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                reservations: MockReservationRepository::new(),
                venues: MockVenueRepository::new(),
                users: MockUserRepository::new(),
                gateway: MockPaymentGateway::new(),
                mailer: MockMailer::new(),
            }
        }

        /// Venue priced at 150000 per hour and a known customer.
        fn priced() -> Self {
            let mut mocks = Self::new();
            mocks
                .venues
                .expect_price()
                .returning(|_| Ok(Some(BigDecimal::from(150_000))));
            mocks.users.expect_find_by_id().returning(|id| Ok(Some(customer(id))));
            mocks
        }

        fn service(self) -> ReservationService {
            ReservationService::new(
                Arc::new(self.reservations),
                Arc::new(self.venues),
                Arc::new(self.users),
                Arc::new(self.gateway),
                Arc::new(self.mailer),
            )
        }
    }

    fn customer(id: Uuid) -> User {
        let now = Utc::now();
        User {
            id,
            name: "Dewi".to_string(),
            email: "dewi@example.com".to_string(),
            password_hash: String::new(),
            phone: Some("08123456789".to_string()),
            role: "user".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn held(new: NewReservation) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: new.id,
            user_id: new.user_id,
            venue_id: new.venue_id,
            payment_id: None,
            check_in: new.check_in,
            check_out: new.check_out,
            duration: new.duration,
            subtotal: new.subtotal,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn stored(new: NewPayment) -> Payment {
        let now = Utc::now();
        Payment {
            id: new.id,
            reservation_id: new.reservation_id,
            payment_method: new.payment_method,
            payment_code: new.payment_code,
            grand_total: new.grand_total,
            status: new.status,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment_row(status: &str) -> Payment {
        let now = Utc::now();
        Payment {
            id: "trx-1".to_string(),
            reservation_id: Uuid::new_v4(),
            payment_method: "bca".to_string(),
            payment_code: "12345678".to_string(),
            grand_total: "150000.00".to_string(),
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn gopay_charge() -> ChargeResponse {
        ChargeResponse {
            status_code: "201".to_string(),
            transaction_id: "trx-gopay".to_string(),
            transaction_status: Some("pending".to_string()),
            actions: vec![
                Action {
                    name: "generate-qr-code".to_string(),
                    method: "GET".to_string(),
                    url: "https://api.sandbox.midtrans.com/v2/gopay/trx-gopay/qr-code".to_string(),
                },
                Action {
                    name: "deeplink-redirect".to_string(),
                    method: "GET".to_string(),
                    url: "gojek://gopay/merchanttransfer?tref=trx-gopay".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    fn slot(hours_from_now: i64, minutes: i64) -> ReservationInput {
        let check_in = Utc::now() + Duration::hours(hours_from_now);
        ReservationInput {
            venue_id: Uuid::new_v4().to_string(),
            check_in: Some(check_in),
            check_out: Some(check_in + Duration::minutes(minutes)),
        }
    }

    fn pay_with(payment_type: &str) -> PaymentInput {
        PaymentInput {
            payment_type: payment_type.to_string(),
            grand_total: None,
        }
    }

    fn update(status: TransactionStatus, grand_total: &str) -> PaymentUpdate {
        PaymentUpdate {
            transaction_id: "trx-1".to_string(),
            reservation_id: Uuid::new_v4(),
            status,
            payment_type: "bank_transfer".to_string(),
            grand_total: grand_total.to_string(),
        }
    }

    #[test]
    fn duration_rounds_up_to_whole_hours() {
        let price = BigDecimal::from(100);
        let start = Utc::now();

        let short = Quote::new(&price, start, start + Duration::minutes(30)).unwrap();
        assert_eq!(short.duration, 1);

        let quote = Quote::new(&price, start, start + Duration::minutes(61)).unwrap();
        assert_eq!(quote.duration, 2);
        assert_eq!(quote.subtotal, BigDecimal::from(200));
        assert_eq!(quote.grand_total, "200.00");
        assert_eq!(quote.gross_amount, 200);
    }

    #[test]
    fn claimed_total_must_match() {
        let start = Utc::now();
        let quote = Quote::new(&BigDecimal::from(150_000), start, start + Duration::hours(2)).unwrap();

        assert!(quote.confirm(None).is_ok());
        assert!(quote.confirm(Some("300000")).is_ok());
        assert!(quote.confirm(Some("300000.00")).is_ok());
        assert!(matches!(
            quote.confirm(Some("299999")),
            Err(AppError::Validation(ref m)) if m == "grand_total does not match venue price"
        ));
        assert!(matches!(
            quote.confirm(Some("three hundred")),
            Err(AppError::Validation(ref m)) if m == "failed to parse grand_total"
        ));
    }

    #[tokio::test]
    async fn gopay_reservation_uses_first_action_url_as_payment_code() {
        let mut mocks = Mocks::priced();
        mocks
            .reservations
            .expect_create_if_available()
            .withf(|r| r.duration == 2 && r.subtotal == BigDecimal::from(300_000))
            .times(1)
            .returning(|r| Ok(Some(held(r))));
        mocks
            .gateway
            .expect_charge()
            .withf(|order| order.method == PaymentMethod::Gopay && order.gross_amount == 300_000)
            .times(1)
            .returning(|_| Ok(gopay_charge()));
        mocks
            .reservations
            .expect_attach_payment()
            .withf(|p| p.id == "trx-gopay" && p.grand_total == "300000.00" && p.status == "pending")
            .times(1)
            .returning(|p| Ok(stored(p)));
        mocks.mailer.expect_send().times(1).returning(|_| Ok(()));

        let (reservation, payment) = mocks
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 90), pay_with("gopay"))
            .await
            .unwrap();

        assert_eq!(payment.payment_code, "https://api.sandbox.midtrans.com/v2/gopay/trx-gopay/qr-code");
        assert_eq!(payment.payment_method, "gopay");
        assert_eq!(reservation.payment_id.as_deref(), Some("trx-gopay"));
    }

    #[tokio::test]
    async fn unknown_payment_type_has_no_side_effects() {
        let err = Mocks::new()
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 60), pay_with("unknown"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "invalid payment_type"));
    }

    #[tokio::test]
    async fn check_out_before_check_in_is_rejected() {
        let mut input = slot(24, 60);
        std::mem::swap(&mut input.check_in, &mut input.check_out);

        let err = Mocks::new()
            .service()
            .make_reservation(Uuid::new_v4(), input, pay_with("bca"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "check_out must be after check_in"));
    }

    #[tokio::test]
    async fn past_or_malformed_input_is_rejected() {
        let svc = Mocks::new().service();

        let past = svc
            .make_reservation(Uuid::new_v4(), slot(-3, 60), pay_with("bca"))
            .await
            .unwrap_err();
        assert!(matches!(past, AppError::Validation(_)));

        let mut bad_venue = slot(24, 60);
        bad_venue.venue_id = "venue-1".to_string();
        let err = svc.make_reservation(Uuid::new_v4(), bad_venue, pay_with("bca")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut missing = slot(24, 60);
        missing.check_out = None;
        let err = svc.make_reservation(Uuid::new_v4(), missing, pay_with("bca")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "check_out is required"));
    }

    #[tokio::test]
    async fn overlapping_slot_is_not_charged() {
        let mut mocks = Mocks::priced();
        mocks.reservations.expect_create_if_available().returning(|_| Ok(None));
        mocks.gateway.expect_charge().never();
        mocks.reservations.expect_attach_payment().never();

        let err = mocks
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 60), pay_with("bca"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "reservation not available"));
    }

    #[tokio::test]
    async fn mismatched_total_stops_before_booking() {
        let mut mocks = Mocks::priced();
        mocks.reservations.expect_create_if_available().never();

        let payment = PaymentInput {
            payment_type: "bca".to_string(),
            grand_total: Some("1000".to_string()),
        };
        let err = mocks
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 60), payment)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "grand_total does not match venue price"));
    }

    #[tokio::test]
    async fn unknown_venue_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.venues.expect_price().returning(|_| Ok(None));

        let err = mocks
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 60), pay_with("bca"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "venue not found"));
    }

    #[tokio::test]
    async fn failed_charge_releases_the_slot() {
        let mut mocks = Mocks::priced();
        mocks
            .reservations
            .expect_create_if_available()
            .returning(|r| Ok(Some(held(r))));
        mocks.gateway.expect_charge().returning(|_| {
            Err(GatewayError::Rejected {
                status_code: "505".to_string(),
                message: "Unable to create va_number for this transaction".to_string(),
            })
        });
        mocks.gateway.expect_cancel().never();
        mocks.reservations.expect_discard().times(1).returning(|_| Ok(()));
        mocks.reservations.expect_attach_payment().never();

        let err = mocks
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 60), pay_with("bni"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(ref m) if m.contains("Unable to create va_number")));
    }

    #[tokio::test]
    async fn failed_payment_insert_cancels_charge_and_releases_slot() {
        let mut mocks = Mocks::priced();
        mocks
            .reservations
            .expect_create_if_available()
            .returning(|r| Ok(Some(held(r))));
        mocks.gateway.expect_charge().returning(|_| {
            Ok(ChargeResponse {
                status_code: "201".to_string(),
                transaction_id: "trx-bca".to_string(),
                va_numbers: vec![payment_gateway::VaNumber {
                    bank: "bca".to_string(),
                    va_number: "12345678901".to_string(),
                }],
                ..Default::default()
            })
        });
        mocks
            .reservations
            .expect_attach_payment()
            .returning(|_| Err(anyhow::anyhow!("deadlock detected")));
        mocks
            .gateway
            .expect_cancel()
            .times(1)
            .returning(|_| Ok(ChargeResponse::default()));
        mocks.reservations.expect_discard().times(1).returning(|_| Ok(()));
        mocks.mailer.expect_send().never();

        let err = mocks
            .service()
            .make_reservation(Uuid::new_v4(), slot(24, 60), pay_with("bca"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn expire_is_stored_as_expire() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_update_payment_status()
            .with(eq("trx-1".to_string()), eq("expire".to_string()))
            .times(1)
            .returning(|_, status| Ok(Some(payment_row(&status))));
        mocks.gateway.expect_refund().never();

        let payment = mocks
            .service()
            .reservation_status(update(TransactionStatus::Expire, "150000.00"))
            .await
            .unwrap();
        assert_eq!(payment.status, "expire");
    }

    #[tokio::test]
    async fn settlement_is_stored_as_success() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_update_payment_status()
            .with(eq("trx-1".to_string()), eq("success".to_string()))
            .times(1)
            .returning(|_, status| Ok(Some(payment_row(&status))));

        let payment = mocks
            .service()
            .reservation_status(update(TransactionStatus::Settlement, "150000"))
            .await
            .unwrap();
        assert_eq!(payment.status, "success");
    }

    #[tokio::test]
    async fn cancellation_close_to_checkout_is_refused() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_checkout_date()
            .returning(|_| Ok(Some(Utc::now() + Duration::minutes(30))));
        mocks.gateway.expect_refund().never();
        mocks.reservations.expect_update_payment_status().never();

        let err = mocks
            .service()
            .reservation_status(update(TransactionStatus::Cancel, "150000.00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "refund cannot be processed at least 1 hour away"));
    }

    #[tokio::test]
    async fn cancellation_after_checkout_is_refused() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_checkout_date()
            .returning(|_| Ok(Some(Utc::now() - Duration::days(1))));
        mocks.gateway.expect_refund().never();
        mocks.reservations.expect_update_payment_status().never();

        let err = mocks
            .service()
            .reservation_status(update(TransactionStatus::Cancel, "150000.00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn early_cancellation_is_refunded_then_stored() {
        let mut mocks = Mocks::new();
        let change = update(TransactionStatus::Cancel, "150000.75");
        let order_id = change.reservation_id.to_string();
        mocks
            .reservations
            .expect_checkout_date()
            .returning(|_| Ok(Some(Utc::now() + Duration::days(2))));
        mocks
            .gateway
            .expect_refund()
            .with(eq(order_id), eq(150_000i64), eq(REFUND_REASON.to_string()))
            .times(1)
            .returning(|_, _, _| Ok(RefundResponse::default()));
        mocks
            .reservations
            .expect_update_payment_status()
            .with(eq("trx-1".to_string()), eq("cancel".to_string()))
            .times(1)
            .returning(|_, status| Ok(Some(payment_row(&status))));

        let payment = mocks.service().reservation_status(change).await.unwrap();
        assert_eq!(payment.status, "cancel");
    }

    #[tokio::test]
    async fn refund_failure_is_upstream() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_checkout_date()
            .returning(|_| Ok(Some(Utc::now() + Duration::days(2))));
        mocks.gateway.expect_refund().returning(|_, _, _| {
            Err(GatewayError::Rejected {
                status_code: "412".to_string(),
                message: "Transaction status cannot be updated".to_string(),
            })
        });
        mocks.reservations.expect_update_payment_status().never();

        let err = mocks
            .service()
            .reservation_status(update(TransactionStatus::Cancel, "150000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(ref m) if m.starts_with("failed to refund transaction: ")));
    }

    #[tokio::test]
    async fn unparseable_grand_total_short_circuits() {
        let svc = Mocks::new().service();

        for total in ["abc", "-10", "NaN", "inf"] {
            let err = svc
                .reservation_status(update(TransactionStatus::Cancel, total))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("failed to parse grand total: ")));
        }
    }

    #[tokio::test]
    async fn oversized_grand_total_is_not_refunded() {
        let mut mocks = Mocks::new();
        mocks.reservations.expect_checkout_date().never();
        mocks.gateway.expect_refund().never();

        let err = mocks
            .service()
            .reservation_status(update(TransactionStatus::Cancel, "1e30"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.ends_with("is out of range")));
    }

    #[tokio::test]
    async fn checkout_lookup_failure_is_internal() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_checkout_date()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));

        let err = mocks
            .service()
            .reservation_status(update(TransactionStatus::Cancel, "150000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(ref m) if m == "failed to get checkout date: connection reset"));
    }

    #[tokio::test]
    async fn status_write_failures_are_labelled() {
        let mut mocks = Mocks::new();
        mocks
            .reservations
            .expect_update_payment_status()
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        let svc = mocks.service();

        let expire = svc
            .reservation_status(update(TransactionStatus::Expire, "1"))
            .await
            .unwrap_err();
        assert!(matches!(expire, AppError::Internal(ref m) if m == "error on updating status to expire: disk full"));

        let settle = svc
            .reservation_status(update(TransactionStatus::Settlement, "1"))
            .await
            .unwrap_err();
        assert!(matches!(settle, AppError::Internal(ref m) if m == "failed to update payment status: disk full"));
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.reservations.expect_update_payment_status().returning(|_, _| Ok(None));

        let err = mocks
            .service()
            .reservation_status(update(TransactionStatus::Pending, "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "payment not found"));
    }

    #[tokio::test]
    async fn detail_of_another_users_reservation_is_hidden() {
        let owner_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks.reservations.expect_find_detail().returning(move |id| {
            let start = Utc::now();
            let reservation = held(NewReservation {
                id,
                user_id: owner_id,
                venue_id: Uuid::new_v4(),
                check_in: start,
                check_out: start + Duration::hours(1),
                duration: 1,
                subtotal: BigDecimal::from(1),
            });
            Ok(Some(ReservationDetail {
                reservation,
                venue_name: "Hall".to_string(),
                payment: None,
            }))
        });
        let svc = mocks.service();

        assert!(svc.transaction_detail(owner_id, Uuid::new_v4()).await.is_ok());
        let err = svc.transaction_detail(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
