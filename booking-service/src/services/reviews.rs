use serde::Deserialize;
use shared::{PageRequest, Pagination};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::auth::Principal;
use crate::error::{AppError, AppResult};
use crate::models::{NewReview, Review, ReviewWithAuthor};
use crate::repository::{ReviewRepository, VenueRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub rating: i32,
    pub comment: String,
}

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    venues: Arc<dyn VenueRepository>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepository>, venues: Arc<dyn VenueRepository>) -> Self {
        Self { reviews, venues }
    }

    pub async fn create_review(&self, author: Principal, venue_id: Uuid, input: ReviewInput) -> AppResult<Review> {
        if !(1..=5).contains(&input.rating) {
            return Err(AppError::validation("rating must be between 1 and 5"));
        }
        let comment = input.comment.trim();
        if comment.is_empty() {
            return Err(AppError::validation("comment is required"));
        }

        self.ensure_venue(venue_id).await?;

        let review = self
            .reviews
            .create(NewReview {
                id: Uuid::new_v4(),
                user_id: author.id,
                venue_id,
                rating: input.rating,
                comment: comment.to_string(),
            })
            .await?
            .ok_or_else(|| AppError::Conflict("you have already reviewed this venue".to_string()))?;

        info!("User {} reviewed venue {} with {}", author.id, venue_id, review.rating);
        Ok(review)
    }

    pub async fn list_reviews(&self, venue_id: Uuid, page: PageRequest) -> AppResult<(Vec<ReviewWithAuthor>, Pagination)> {
        self.ensure_venue(venue_id).await?;

        let (reviews, total) = self.reviews.list_by_venue(venue_id, page).await?;
        Ok((reviews, Pagination::new(page, total)))
    }

    async fn ensure_venue(&self, venue_id: Uuid) -> AppResult<()> {
        match self.venues.find(venue_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("venue not found")),
        }
    }
}
