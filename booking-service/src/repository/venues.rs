use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use shared::PageRequest;
use uuid::Uuid;

use super::{DbPool, VenueFilter, VenueRepository};
use crate::models::*;
use crate::schema::*;

pub struct PgVenueRepository {
    pool: DbPool,
}

impl PgVenueRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn filtered(filter: &VenueFilter) -> venues::BoxedQuery<'static, Pg> {
    let mut query = venues::table.filter(venues::deleted_at.is_null()).into_boxed();

    if let Some(name) = &filter.name {
        query = query.filter(venues::name.ilike(like_pattern(name)));
    }
    if let Some(category) = &filter.category {
        query = query.filter(venues::category.eq(category.clone()));
    }
    if let Some(location) = &filter.location {
        query = query.filter(venues::location.ilike(like_pattern(location)));
    }
    if let Some(min) = &filter.min_price {
        query = query.filter(venues::price.ge(min.clone()));
    }
    if let Some(max) = &filter.max_price {
        query = query.filter(venues::price.le(max.clone()));
    }
    query
}

#[async_trait]
impl VenueRepository for PgVenueRepository {
    async fn create(&self, venue: NewVenue) -> Result<Venue> {
        let mut conn = self.pool.get().await?;

        let venue = diesel::insert_into(venues::table)
            .values(&venue)
            .returning(Venue::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(venue)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Venue>> {
        let mut conn = self.pool.get().await?;

        let venue = venues::table
            .filter(venues::id.eq(id))
            .filter(venues::deleted_at.is_null())
            .select(Venue::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(venue)
    }

    async fn price(&self, id: Uuid) -> Result<Option<BigDecimal>> {
        let mut conn = self.pool.get().await?;

        let price = venues::table
            .filter(venues::id.eq(id))
            .filter(venues::deleted_at.is_null())
            .select(venues::price)
            .first::<BigDecimal>(&mut conn)
            .await
            .optional()?;
        Ok(price)
    }

    async fn search(&self, filter: VenueFilter, page: PageRequest) -> Result<(Vec<Venue>, i64)> {
        let mut conn = self.pool.get().await?;

        let total = filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let venues = filtered(&filter)
            .order(venues::created_at.desc())
            .limit(page.limit())
            .offset(page.offset())
            .select(Venue::as_select())
            .load(&mut conn)
            .await?;

        Ok((venues, total))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now();

        let updated = diesel::update(
            venues::table
                .filter(venues::id.eq(id))
                .filter(venues::deleted_at.is_null()),
        )
        .set((venues::deleted_at.eq(Some(now)), venues::updated_at.eq(now)))
        .execute(&mut conn)
        .await?;
        Ok(updated > 0)
    }

    async fn add_picture(&self, picture: VenuePicture) -> Result<VenuePicture> {
        let mut conn = self.pool.get().await?;

        let picture = diesel::insert_into(venue_pictures::table)
            .values(&picture)
            .returning(VenuePicture::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(picture)
    }

    async fn pictures(&self, venue_id: Uuid) -> Result<Vec<VenuePicture>> {
        let mut conn = self.pool.get().await?;

        let pictures = venue_pictures::table
            .filter(venue_pictures::venue_id.eq(venue_id))
            .order(venue_pictures::created_at.asc())
            .select(VenuePicture::as_select())
            .load(&mut conn)
            .await?;
        Ok(pictures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("hall"), "%hall%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
