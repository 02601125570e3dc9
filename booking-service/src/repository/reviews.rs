use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use num_traits::ToPrimitive;
use shared::PageRequest;
use uuid::Uuid;

use super::{DbPool, ReviewRepository};
use crate::models::*;
use crate::schema::*;

pub struct PgReviewRepository {
    pool: DbPool,
}

impl PgReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create(&self, review: NewReview) -> Result<Option<Review>> {
        let mut conn = self.pool.get().await?;

        let inserted = diesel::insert_into(reviews::table)
            .values(&review)
            .returning(Review::as_returning())
            .get_result(&mut conn)
            .await;

        match inserted {
            Ok(review) => Ok(Some(review)),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_by_venue(&self, venue_id: Uuid, page: PageRequest) -> Result<(Vec<ReviewWithAuthor>, i64)> {
        let mut conn = self.pool.get().await?;

        let total = reviews::table
            .filter(reviews::venue_id.eq(venue_id))
            .filter(reviews::deleted_at.is_null())
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let rows = reviews::table
            .inner_join(users::table)
            .filter(reviews::venue_id.eq(venue_id))
            .filter(reviews::deleted_at.is_null())
            .order(reviews::created_at.desc())
            .limit(page.limit())
            .offset(page.offset())
            .select((Review::as_select(), users::name))
            .load::<(Review, String)>(&mut conn)
            .await?;

        let reviews = rows
            .into_iter()
            .map(|(review, author)| ReviewWithAuthor { review, author })
            .collect();
        Ok((reviews, total))
    }

    async fn average_rating(&self, venue_id: Uuid) -> Result<Option<f64>> {
        let mut conn = self.pool.get().await?;

        let average = reviews::table
            .filter(reviews::venue_id.eq(venue_id))
            .filter(reviews::deleted_at.is_null())
            .select(diesel::dsl::avg(reviews::rating))
            .first::<Option<BigDecimal>>(&mut conn)
            .await?;
        Ok(average.and_then(|avg| avg.to_f64()))
    }
}
