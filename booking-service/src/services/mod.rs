//! Business rules. Services own validation and classify repository and
//! gateway failures into `AppError`.

pub mod auth;
pub mod reservations;
pub mod reviews;
pub mod users;
pub mod venues;

pub use auth::{JwtIssuer, Principal, TokenIssuer};
pub use reservations::{PaymentInput, PaymentUpdate, ReservationInput, ReservationService};
pub use reviews::{ReviewInput, ReviewService};
pub use users::{LoginInput, RegisterInput, Session, UserService};
pub use venues::{ImageUpload, VenueDetail, VenueInput, VenueService};
