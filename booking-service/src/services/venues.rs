use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{PageRequest, Pagination};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::Principal;
use crate::error::{AppError, AppResult};
use crate::models::{NewVenue, ReviewWithAuthor, Role, Venue, VenuePicture};
use crate::repository::{ReviewRepository, VenueFilter, VenueRepository};
use crate::storage::ImageStore;

const ALLOWED_IMAGE_TYPES: [(&str, &str); 3] = [("image/jpeg", "jpg"), ("image/png", "png"), ("image/webp", "webp")];

#[derive(Debug, Clone, Deserialize)]
pub struct VenueInput {
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: BigDecimal,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueDetail {
    #[serde(flatten)]
    pub venue: Venue,
    pub pictures: Vec<VenuePicture>,
    pub reviews: Vec<ReviewWithAuthor>,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub struct VenueService {
    venues: Arc<dyn VenueRepository>,
    reviews: Arc<dyn ReviewRepository>,
    images: Arc<dyn ImageStore>,
    max_image_bytes: usize,
}

impl VenueService {
    pub fn new(
        venues: Arc<dyn VenueRepository>,
        reviews: Arc<dyn ReviewRepository>,
        images: Arc<dyn ImageStore>,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            venues,
            reviews,
            images,
            max_image_bytes,
        }
    }

    pub async fn create_venue(&self, owner: Principal, input: VenueInput) -> AppResult<Venue> {
        if owner.role != Role::Owner {
            return Err(AppError::Forbidden("only venue owners can create venues".to_string()));
        }

        let new_venue = NewVenue {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            category: required(&input.category, "category")?,
            name: required(&input.name, "name")?,
            description: input.description.unwrap_or_default().trim().to_string(),
            price: input.price,
            location: required(&input.location, "location")?,
            latitude: input.latitude,
            longitude: input.longitude,
        };
        if new_venue.price < BigDecimal::from(0) {
            return Err(AppError::validation("price must not be negative"));
        }
        if !(-90.0..=90.0).contains(&new_venue.latitude) {
            return Err(AppError::validation("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&new_venue.longitude) {
            return Err(AppError::validation("longitude must be between -180 and 180"));
        }

        let venue = self.venues.create(new_venue).await?;
        info!("Owner {} created venue {}", owner.id, venue.id);
        Ok(venue)
    }

    pub async fn search_venues(&self, filter: VenueFilter, page: PageRequest) -> AppResult<(Vec<Venue>, Pagination)> {
        if let (Some(min), Some(max)) = (&filter.min_price, &filter.max_price) {
            if min > max {
                return Err(AppError::validation("min_price must not exceed max_price"));
            }
        }

        let (venues, total) = self.venues.search(filter, page).await?;
        Ok((venues, Pagination::new(page, total)))
    }

    pub async fn venue_detail(&self, id: Uuid) -> AppResult<VenueDetail> {
        let venue = self.live_venue(id).await?;
        let (pictures, (reviews, _), average_rating) = futures::try_join!(
            self.venues.pictures(id),
            self.reviews.list_by_venue(id, PageRequest::default()),
            self.reviews.average_rating(id),
        )?;

        Ok(VenueDetail {
            venue,
            pictures,
            reviews,
            average_rating,
        })
    }

    pub async fn delete_venue(&self, owner: Principal, id: Uuid) -> AppResult<()> {
        let venue = self.owned_venue(owner, id).await?;

        if !self.venues.soft_delete(venue.id).await? {
            return Err(AppError::not_found("venue not found"));
        }
        info!("Owner {} deleted venue {}", owner.id, venue.id);
        Ok(())
    }

    pub async fn upload_picture(&self, owner: Principal, venue_id: Uuid, upload: ImageUpload) -> AppResult<VenuePicture> {
        let extension = ALLOWED_IMAGE_TYPES
            .iter()
            .find(|(content_type, _)| *content_type == upload.content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| AppError::validation("image must be jpeg, png or webp"))?;
        if upload.bytes.is_empty() {
            return Err(AppError::validation("image is empty"));
        }
        if upload.bytes.len() > self.max_image_bytes {
            return Err(AppError::validation(format!(
                "image exceeds the {} byte limit",
                self.max_image_bytes
            )));
        }

        let venue = self.owned_venue(owner, venue_id).await?;

        let picture_id = Uuid::new_v4();
        let key = format!("venues/{}/{}.{}", venue.id, picture_id, extension);
        let url = self.images.put(key, upload.content_type, upload.bytes).await?;

        let picture = self
            .venues
            .add_picture(VenuePicture {
                id: picture_id,
                venue_id: venue.id,
                url,
                created_at: Utc::now(),
            })
            .await?;
        info!("Added picture {} to venue {}", picture.id, venue.id);
        Ok(picture)
    }

    async fn live_venue(&self, id: Uuid) -> AppResult<Venue> {
        self.venues
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("venue not found"))
    }

    async fn owned_venue(&self, owner: Principal, id: Uuid) -> AppResult<Venue> {
        if owner.role != Role::Owner {
            return Err(AppError::Forbidden("only venue owners can manage venues".to_string()));
        }
        let venue = self.live_venue(id).await?;
        if venue.owner_id != owner.id {
            warn!("User {} tried to manage venue {} owned by {}", owner.id, venue.id, venue.owner_id);
            return Err(AppError::Forbidden("venue belongs to another owner".to_string()));
        }
        Ok(venue)
    }
}
