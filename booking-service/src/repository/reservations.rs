use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::PageRequest;
use uuid::Uuid;

use super::{DbPool, ReservationRepository, RELEASED_STATUSES};
use crate::models::*;
use crate::schema::*;

pub struct PgReservationRepository {
    pool: DbPool,
}

impl PgReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// A live reservation on the venue, with the status of its payment once charged.
#[derive(Debug, Clone, PartialEq, Queryable)]
struct BookedSlot {
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    payment_status: Option<String>,
}

/// Half-open intervals: a booking ending at 10:00 leaves 10:00 free.
fn overlaps(slot: &BookedSlot, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> bool {
    slot.check_in < check_out && check_in < slot.check_out
}

/// No payment yet means the charge is still in flight, which holds the slot.
fn holds_slot(payment_status: Option<&str>) -> bool {
    payment_status.map_or(true, |status| !RELEASED_STATUSES.contains(&status))
}

fn conflicts(booked: &[BookedSlot], check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> bool {
    booked
        .iter()
        .any(|slot| overlaps(slot, check_in, check_out) && holds_slot(slot.payment_status.as_deref()))
}

/// Whether a live reservation holds any part of `[check_in, check_out)` on the venue.
async fn slot_taken(
    conn: &mut AsyncPgConnection,
    venue_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> Result<bool> {
    let booked = reservations::table
        .left_join(payments::table)
        .filter(reservations::venue_id.eq(venue_id))
        .filter(reservations::deleted_at.is_null())
        .filter(reservations::check_in.lt(check_out))
        .filter(reservations::check_out.gt(check_in))
        .select((reservations::check_in, reservations::check_out, payments::status.nullable()))
        .load::<BookedSlot>(conn)
        .await?;

    Ok(conflicts(&booked, check_in, check_out))
}

fn is_serialization_failure(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DieselError>(),
        Some(DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _))
    )
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create_if_available(&self, reservation: NewReservation) -> Result<Option<Reservation>> {
        let mut conn = self.pool.get().await?;

        let created: Result<Option<Reservation>> = conn
            .build_transaction()
            .serializable()
            .run(|conn| {
                Box::pin(async move {
                    if slot_taken(conn, reservation.venue_id, reservation.check_in, reservation.check_out).await? {
                        return Ok(None);
                    }

                    let inserted = diesel::insert_into(reservations::table)
                        .values(&reservation)
                        .returning(Reservation::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Some(inserted))
                })
            })
            .await;

        match created {
            Ok(created) => Ok(created),
            // A concurrent booking of the same slot committed first.
            Err(e) if is_serialization_failure(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn attach_payment(&self, payment: NewPayment) -> Result<Payment> {
        let mut conn = self.pool.get().await?;

        let stored = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let stored = diesel::insert_into(payments::table)
                        .values(&payment)
                        .returning(Payment::as_returning())
                        .get_result(conn)
                        .await?;

                    let updated = diesel::update(
                        reservations::table
                            .filter(reservations::id.eq(payment.reservation_id))
                            .filter(reservations::deleted_at.is_null()),
                    )
                    .set((
                        reservations::payment_id.eq(Some(payment.id.clone())),
                        reservations::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await?;

                    if updated == 0 {
                        anyhow::bail!("reservation {} is no longer active", payment.reservation_id);
                    }
                    Ok(stored)
                })
            })
            .await?;

        Ok(stored)
    }

    async fn discard(&self, id: Uuid) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now();

        diesel::update(
            reservations::table
                .filter(reservations::id.eq(id))
                .filter(reservations::deleted_at.is_null()),
        )
        .set((reservations::deleted_at.eq(Some(now)), reservations::updated_at.eq(now)))
        .execute(&mut conn)
        .await?;
        Ok(())
    }

    async fn checkout_date(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let mut conn = self.pool.get().await?;

        let check_out = reservations::table
            .filter(reservations::id.eq(id))
            .filter(reservations::deleted_at.is_null())
            .select(reservations::check_out)
            .first::<DateTime<Utc>>(&mut conn)
            .await
            .optional()?;
        Ok(check_out)
    }

    async fn update_payment_status(&self, transaction_id: String, status: String) -> Result<Option<Payment>> {
        let mut conn = self.pool.get().await?;

        let payment = diesel::update(payments::table.filter(payments::id.eq(transaction_id)))
            .set((payments::status.eq(status), payments::updated_at.eq(Utc::now())))
            .returning(Payment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(payment)
    }

    async fn history(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<ReservationSummary>, i64)> {
        let mut conn = self.pool.get().await?;

        let total = reservations::table
            .filter(reservations::user_id.eq(user_id))
            .filter(reservations::deleted_at.is_null())
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let rows = reservations::table
            .inner_join(venues::table)
            .left_join(payments::table)
            .filter(reservations::user_id.eq(user_id))
            .filter(reservations::deleted_at.is_null())
            .order(reservations::created_at.desc())
            .limit(page.limit())
            .offset(page.offset())
            .select((
                Reservation::as_select(),
                venues::name,
                payments::status.nullable(),
                payments::grand_total.nullable(),
            ))
            .load::<(Reservation, String, Option<String>, Option<String>)>(&mut conn)
            .await?;

        let summaries = rows
            .into_iter()
            .map(|(reservation, venue_name, payment_status, grand_total)| ReservationSummary {
                reservation,
                venue_name,
                payment_status,
                grand_total,
            })
            .collect();
        Ok((summaries, total))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ReservationDetail>> {
        let mut conn = self.pool.get().await?;

        let found = reservations::table
            .inner_join(venues::table)
            .filter(reservations::id.eq(id))
            .filter(reservations::deleted_at.is_null())
            .select((Reservation::as_select(), venues::name))
            .first::<(Reservation, String)>(&mut conn)
            .await
            .optional()?;

        let Some((reservation, venue_name)) = found else {
            return Ok(None);
        };

        let payment = payments::table
            .filter(payments::reservation_id.eq(reservation.id))
            .select(Payment::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(Some(ReservationDetail {
            reservation,
            venue_name,
            payment,
        }))
    }

    async fn sweep_orphans(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now();

        let swept = diesel::update(
            reservations::table
                .filter(reservations::payment_id.is_null())
                .filter(reservations::deleted_at.is_null())
                .filter(reservations::created_at.lt(cutoff)),
        )
        .set((reservations::deleted_at.eq(Some(now)), reservations::updated_at.eq(now)))
        .execute(&mut conn)
        .await?;
        Ok(swept)
    }
}
