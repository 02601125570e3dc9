use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};

use super::{json_body, parse_id, reply, reply_page, AppState, AuthUser, PageQuery, Reply};
use crate::models::{Review, ReviewWithAuthor};
use crate::services::ReviewInput;

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Reply<Review> {
    let venue_id = parse_id(&id, "venue")?;
    let review = state
        .reviews
        .create_review(principal, venue_id, json_body(payload)?)
        .await?;
    reply(StatusCode::CREATED, "review created", review)
}

pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Reply<Vec<ReviewWithAuthor>> {
    let venue_id = parse_id(&id, "venue")?;
    let (reviews, pagination) = state.reviews.list_reviews(venue_id, query.page_request()).await?;
    reply_page("reviews", reviews, pagination)
}
