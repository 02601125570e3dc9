use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use payment_gateway::verify_signature;
use serde::{Deserialize, Serialize};
use shared::PaymentNotification;
use tracing::warn;

use super::{json_body, parse_id, reply, reply_page, AppState, AuthUser, PageQuery, Reply};
use crate::error::AppError;
use crate::models::{Payment, Reservation, ReservationDetail, ReservationSummary};
use crate::services::{PaymentInput, PaymentUpdate, ReservationInput};

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    #[serde(flatten)]
    pub reservation: ReservationInput,
    #[serde(flatten)]
    pub payment: PaymentInput,
}

#[derive(Debug, Serialize)]
pub struct ReservationCreated {
    pub reservation: Reservation,
    pub payment: Payment,
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Reply<ReservationCreated> {
    let request = json_body(payload)?;
    let (reservation, payment) = state
        .reservations
        .make_reservation(principal.id, request.reservation, request.payment)
        .await?;
    reply(
        StatusCode::CREATED,
        "reservation created",
        ReservationCreated { reservation, payment },
    )
}

pub async fn callback(
    State(state): State<AppState>,
    payload: Result<Json<PaymentNotification>, JsonRejection>,
) -> Reply<Payment> {
    let notification = json_body(payload)?;

    if let Some(server_key) = &state.callback_key {
        if !verify_signature(&notification, server_key) {
            warn!("Rejected callback for order {} with a bad signature", notification.order_id);
            return Err(AppError::Unauthorized("invalid signature".to_string()));
        }
    }

    let update = PaymentUpdate {
        reservation_id: parse_id(&notification.order_id, "order")?,
        transaction_id: notification.transaction_id,
        status: notification.transaction_status,
        payment_type: notification.payment_type,
        grand_total: notification.gross_amount,
    };
    let payment = state.reservations.reservation_status(update).await?;
    reply(StatusCode::OK, "payment status updated", payment)
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<PageQuery>,
) -> Reply<Vec<ReservationSummary>> {
    let (history, pagination) = state
        .reservations
        .reservation_history(principal.id, query.page_request())
        .await?;
    reply_page("reservation history", history, pagination)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Reply<ReservationDetail> {
    let detail = state
        .reservations
        .transaction_detail(principal.id, parse_id(&id, "reservation")?)
        .await?;
    reply(StatusCode::OK, "reservation detail", detail)
}
