use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::str::FromStr;

use super::{json_body, parse_id, reply, reply_page, AppState, AuthUser, Reply};
use crate::error::{AppError, AppResult};
use crate::models::{Venue, VenuePicture};
use crate::repository::VenueFilter;
use crate::services::{ImageUpload, VenueDetail, VenueInput};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn price_param(value: Option<String>, name: &str) -> AppResult<Option<BigDecimal>> {
    non_blank(value)
        .map(|raw| BigDecimal::from_str(&raw).map_err(|_| AppError::validation(format!("invalid {name}"))))
        .transpose()
}

impl SearchQuery {
    fn into_filter(self) -> AppResult<VenueFilter> {
        Ok(VenueFilter {
            name: non_blank(self.q),
            category: non_blank(self.category),
            location: non_blank(self.location),
            min_price: price_param(self.min_price, "min_price")?,
            max_price: price_param(self.max_price, "max_price")?,
        })
    }
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Reply<Vec<Venue>> {
    let Query(query) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let page = shared::PageRequest::new(query.page, query.limit);

    let (venues, pagination) = state.venues.search_venues(query.into_filter()?, page).await?;
    reply_page("venues", venues, pagination)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<VenueInput>, JsonRejection>,
) -> Reply<Venue> {
    let venue = state.venues.create_venue(principal, json_body(payload)?).await?;
    reply(StatusCode::CREATED, "venue created", venue)
}

pub async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> Reply<VenueDetail> {
    let detail = state.venues.venue_detail(parse_id(&id, "venue")?).await?;
    reply(StatusCode::OK, "venue detail", detail)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Reply<()> {
    state.venues.delete_venue(principal, parse_id(&id, "venue")?).await?;
    reply(StatusCode::OK, "venue deleted", ())
}

pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Reply<VenuePicture> {
    let venue_id = parse_id(&id, "venue")?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        upload = Some(ImageUpload {
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload = upload.ok_or_else(|| AppError::validation("image field is required"))?;

    let picture = state.venues.upload_picture(principal, venue_id, upload).await?;
    reply(StatusCode::CREATED, "picture uploaded", picture)
}
