//! Data access. Each trait has one Postgres implementation over the shared
//! diesel-async pool; services only see the traits.

mod reservations;
mod reviews;
mod users;
mod venues;

pub use reservations::PgReservationRepository;
pub use reviews::PgReviewRepository;
pub use users::PgUserRepository;
pub use venues::PgVenueRepository;

use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use shared::PageRequest;
use uuid::Uuid;

use crate::models::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// Payment statuses that no longer hold the venue's time slot.
pub const RELEASED_STATUSES: [&str; 4] = ["cancel", "expire", "deny", "failure"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VenueFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns `None` when the email is already registered.
    async fn create(&self, user: NewUser) -> Result<Option<User>>;

    async fn find_by_email(&self, email: String) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VenueRepository: Send + Sync {
    async fn create(&self, venue: NewVenue) -> Result<Venue>;

    async fn find(&self, id: Uuid) -> Result<Option<Venue>>;

    async fn price(&self, id: Uuid) -> Result<Option<BigDecimal>>;

    async fn search(&self, filter: VenueFilter, page: PageRequest) -> Result<(Vec<Venue>, i64)>;

    async fn soft_delete(&self, id: Uuid) -> Result<bool>;

    async fn add_picture(&self, picture: VenuePicture) -> Result<VenuePicture>;

    async fn pictures(&self, venue_id: Uuid) -> Result<Vec<VenuePicture>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Returns `None` when the user already reviewed the venue.
    async fn create(&self, review: NewReview) -> Result<Option<Review>>;

    async fn list_by_venue(&self, venue_id: Uuid, page: PageRequest) -> Result<(Vec<ReviewWithAuthor>, i64)>;

    async fn average_rating(&self, venue_id: Uuid) -> Result<Option<f64>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Inserts the reservation unless a live one overlaps it on the same
    /// venue. Returns `None` when the slot is taken.
    async fn create_if_available(&self, reservation: NewReservation) -> Result<Option<Reservation>>;

    /// Stores the payment and links it to its reservation in one transaction.
    async fn attach_payment(&self, payment: NewPayment) -> Result<Payment>;

    /// Soft-deletes a reservation whose charge never completed.
    async fn discard(&self, id: Uuid) -> Result<()>;

    async fn checkout_date(&self, id: Uuid) -> Result<Option<DateTime<Utc>>>;

    async fn update_payment_status(&self, transaction_id: String, status: String) -> Result<Option<Payment>>;

    async fn history(&self, user_id: Uuid, page: PageRequest) -> Result<(Vec<ReservationSummary>, i64)>;

    async fn find_detail(&self, id: Uuid) -> Result<Option<ReservationDetail>>;

    /// Soft-deletes live reservations created before `cutoff` that never got
    /// a payment attached. Returns how many were swept.
    async fn sweep_orphans(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
