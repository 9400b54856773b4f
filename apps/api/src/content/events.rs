use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::content::resource::{self, Resource};
use crate::errors::AppError;
use crate::models::content::{EventRow, GalleryPhotoRow};
use crate::state::AppState;
use crate::validation::{optional, patch_nullable, patch_required, required};

// ────────────────────────────────────────────────────────────────────────────
// Events
// ────────────────────────────────────────────────────────────────────────────

pub struct Events;

#[derive(Debug, Deserialize)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub is_featured: Option<bool>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Removes the end date; takes precedence over `end_date`.
    #[serde(default)]
    pub clear_end_date: bool,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub is_featured: Option<bool>,
    pub is_published: Option<bool>,
}

pub fn check_event_range(
    event_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    match end_date {
        Some(end) if end < event_date => Err(AppError::Validation(
            "end_date cannot be before event_date".to_string(),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl Resource for Events {
    const TABLE: &'static str = "events";
    const LABEL: &'static str = "Event";
    const ORDER_BY: &'static str = "event_date ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_published");

    type Row = EventRow;
    type Create = EventInput;
    type Patch = EventPatch;

    async fn insert(pool: &PgPool, input: EventInput) -> Result<EventRow, AppError> {
        check_event_range(input.event_date, input.end_date)?;
        Ok(sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events
                (title, description, event_date, end_date, location, image_url,
                 is_featured, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, FALSE), COALESCE($8, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("title", &input.title)?)
        .bind(required("description", &input.description)?)
        .bind(input.event_date)
        .bind(input.end_date)
        .bind(optional(input.location))
        .bind(optional(input.image_url))
        .bind(input.is_featured)
        .bind(input.is_published)
        .fetch_one(pool)
        .await?)
    }

    async fn update(pool: &PgPool, id: Uuid, patch: EventPatch) -> Result<Option<EventRow>, AppError> {
        // The range check needs the merged dates, so read the current row under a lock.
        let mut tx = pool.begin().await?;
        let current = sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(current) = current else {
            return Ok(None);
        };
        let event_date = patch.event_date.unwrap_or(current.event_date);
        let end_date = if patch.clear_end_date {
            None
        } else {
            patch.end_date.or(current.end_date)
        };
        check_event_range(event_date, end_date)?;

        let row = sqlx::query_as::<_, EventRow>(
            r#"
            UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                event_date = $4,
                end_date = $5,
                location = CASE WHEN $6::text IS NULL THEN location ELSE NULLIF($6, '') END,
                image_url = CASE WHEN $7::text IS NULL THEN image_url ELSE NULLIF($7, '') END,
                is_featured = COALESCE($8, is_featured),
                is_published = COALESCE($9, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("title", patch.title)?)
        .bind(patch_required("description", patch.description)?)
        .bind(event_date)
        .bind(end_date)
        .bind(patch_nullable(patch.location))
        .bind(patch_nullable(patch.image_url))
        .bind(patch.is_featured)
        .bind(patch.is_published)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(row))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub upcoming: bool,
}

/// Published events that have not finished yet, soonest first.
pub async fn list_upcoming(pool: &PgPool, limit: i64) -> Result<Vec<EventRow>, AppError> {
    Ok(sqlx::query_as::<_, EventRow>(
        r#"
        SELECT * FROM events
        WHERE is_published AND COALESCE(end_date, event_date) >= NOW()
        ORDER BY event_date ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// GET /api/v1/public/events
pub async fn handle_public_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventRow>>, AppError> {
    let events = if query.upcoming {
        list_upcoming(&state.db, i64::MAX).await?
    } else {
        resource::list_public::<Events>(&state.db).await?
    };
    Ok(Json(events))
}

// ────────────────────────────────────────────────────────────────────────────
// Gallery
// ────────────────────────────────────────────────────────────────────────────

pub struct GalleryPhotos;

#[derive(Debug, Deserialize)]
pub struct GalleryPhotoInput {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub category: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryPhotoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for GalleryPhotos {
    const TABLE: &'static str = "gallery_photos";
    const LABEL: &'static str = "Gallery photo";
    const ORDER_BY: &'static str = "display_order ASC, created_at DESC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = GalleryPhotoRow;
    type Create = GalleryPhotoInput;
    type Patch = GalleryPhotoPatch;

    async fn insert(pool: &PgPool, input: GalleryPhotoInput) -> Result<GalleryPhotoRow, AppError> {
        Ok(sqlx::query_as::<_, GalleryPhotoRow>(
            r#"
            INSERT INTO gallery_photos
                (title, description, image_url, category, display_order, is_active)
            VALUES ($1, $2, $3, $4,
                    COALESCE($5, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM gallery_photos)),
                    COALESCE($6, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("title", &input.title)?)
        .bind(optional(input.description))
        .bind(required("image_url", &input.image_url)?)
        .bind(optional(input.category).map(|c| c.to_lowercase()))
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: GalleryPhotoPatch,
    ) -> Result<Option<GalleryPhotoRow>, AppError> {
        Ok(sqlx::query_as::<_, GalleryPhotoRow>(
            r#"
            UPDATE gallery_photos SET
                title = COALESCE($2, title),
                description = CASE WHEN $3::text IS NULL THEN description ELSE NULLIF($3, '') END,
                image_url = COALESCE($4, image_url),
                category = CASE WHEN $5::text IS NULL THEN category ELSE NULLIF($5, '') END,
                display_order = COALESCE($6, display_order),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("title", patch.title)?)
        .bind(patch_nullable(patch.description))
        .bind(patch_required("image_url", patch.image_url)?)
        .bind(patch_nullable(patch.category).map(|c| c.to_lowercase()))
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_event_range() {
        let start = Utc::now();
        assert!(check_event_range(start, None).is_ok());
        assert!(check_event_range(start, Some(start)).is_ok());
        assert!(check_event_range(start, Some(start + Duration::hours(3))).is_ok());
        assert!(check_event_range(start, Some(start - Duration::hours(1))).is_err());
    }

    #[test]
    fn test_events_query_defaults_to_all() {
        let q: EventsQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.upcoming);
    }

    fn event(title: &str, starts_in_days: i64, lasts_days: Option<i64>, published: bool) -> EventInput {
        let event_date = Utc::now() + Duration::days(starts_in_days);
        EventInput {
            title: title.into(),
            description: "Open to parents.".into(),
            event_date,
            end_date: lasts_days.map(|d| event_date + Duration::days(d)),
            location: None,
            image_url: None,
            is_featured: None,
            is_published: Some(published),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_list_upcoming_skips_past_and_unpublished(pool: PgPool) {
        for input in [
            event("Annual day", 10, None, true),
            event("Last year's fair", -30, None, true),
            event("Book week", -2, Some(5), true),
            event("Staff retreat", 3, None, false),
            event("Science expo", 1, None, true),
        ] {
            Events::insert(&pool, input).await.unwrap();
        }

        let titles: Vec<_> = list_upcoming(&pool, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["Book week", "Science expo", "Annual day"]);

        assert_eq!(list_upcoming(&pool, 1).await.unwrap().len(), 1);
    }
}
