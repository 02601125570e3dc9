mod auth;
mod reservations;
mod reviews;
mod users;
mod venues;

pub use auth::AuthUser;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, PageRequest, Pagination};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{ReservationService, ReviewService, TokenIssuer, UserService, VenueService};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub venues: Arc<VenueService>,
    pub reviews: Arc<ReviewService>,
    pub reservations: Arc<ReservationService>,
    pub tokens: Arc<dyn TokenIssuer>,
    /// Server key used to check callback signatures; `None` skips the check.
    pub callback_key: Option<String>,
    /// Request body cap for picture uploads.
    pub upload_limit: usize,
}

/// Local directory served under a URL prefix.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    pub route: String,
    pub dir: PathBuf,
}

type Reply<T> = AppResult<(StatusCode, Json<ApiResponse<T>>)>;

fn reply<T: Serialize>(status: StatusCode, message: &str, data: T) -> Reply<T> {
    Ok((status, Json(ApiResponse::success(status.as_u16(), message, data))))
}

fn reply_page<T: Serialize>(message: &str, data: T, pagination: Pagination) -> Reply<T> {
    Ok((StatusCode::OK, Json(ApiResponse::paginated(message, data, pagination))))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation(format!("invalid {what} id")))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

pub fn create_router(state: AppState, uploads: Option<StaticFiles>) -> Router {
    let upload_limit = state.upload_limit;

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/me", get(users::me))
        .route("/venues", get(venues::search).post(venues::create))
        .route("/venues/:id", get(venues::detail).delete(venues::delete))
        .route(
            "/venues/:id/pictures",
            post(venues::upload_picture).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/venues/:id/reviews", get(reviews::list).post(reviews::create))
        .route("/reservations", get(reservations::history).post(reservations::create))
        .route("/reservations/callback", post(reservations::callback))
        .route("/reservations/:id", get(reservations::detail))
        .with_state(state);

    if let Some(files) = uploads {
        router = router.nest_service(&files.route, ServeDir::new(files.dir));
    }

    router.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

pub async fn health_check() -> &'static str {
    "OK"
}
