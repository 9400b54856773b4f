use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::content::resource::Resource;
use crate::errors::AppError;
use crate::models::content::{BoardMemberRow, LeadershipMessageRow, TestimonialRow};
use crate::state::AppState;
use crate::validation::{min_chars, one_of, optional, patch_nullable, patch_required, required};

pub const LEADERSHIP_POSITIONS: &[&str] = &["chairman", "principal", "vice_principal", "manager"];
pub const BOARD_TYPES: &[&str] = &["governing_board", "board_of_directors"];
pub const TESTIMONIAL_STATUSES: &[&str] = &["pending", "approved", "rejected"];

// ────────────────────────────────────────────────────────────────────────────
// Leadership messages (chairman / principal desk)
// ────────────────────────────────────────────────────────────────────────────

pub struct LeadershipMessages;

#[derive(Debug, Deserialize)]
pub struct LeadershipMessageInput {
    pub person_name: String,
    pub person_title: String,
    pub position: String,
    pub message_content: String,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadershipMessagePatch {
    pub person_name: Option<String>,
    pub person_title: Option<String>,
    pub position: Option<String>,
    pub message_content: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

#[async_trait]
impl Resource for LeadershipMessages {
    const TABLE: &'static str = "leadership_messages";
    const LABEL: &'static str = "Leadership message";
    const ORDER_BY: &'static str = "display_order ASC, person_name ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = LeadershipMessageRow;
    type Create = LeadershipMessageInput;
    type Patch = LeadershipMessagePatch;

    async fn insert(
        pool: &PgPool,
        input: LeadershipMessageInput,
    ) -> Result<LeadershipMessageRow, AppError> {
        Ok(sqlx::query_as::<_, LeadershipMessageRow>(
            r#"
            INSERT INTO leadership_messages
                (person_name, person_title, position, message_content, photo_url,
                 is_active, display_order)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE),
                    COALESCE($7, (SELECT COALESCE(MAX(display_order), 0) + 1
                                  FROM leadership_messages)))
            RETURNING *
            "#,
        )
        .bind(required("person_name", &input.person_name)?)
        .bind(required("person_title", &input.person_title)?)
        .bind(one_of("position", &input.position, LEADERSHIP_POSITIONS)?)
        .bind(required("message_content", &input.message_content)?)
        .bind(optional(input.photo_url))
        .bind(input.is_active)
        .bind(input.display_order)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: LeadershipMessagePatch,
    ) -> Result<Option<LeadershipMessageRow>, AppError> {
        let position = patch
            .position
            .map(|p| one_of("position", &p, LEADERSHIP_POSITIONS))
            .transpose()?;
        Ok(sqlx::query_as::<_, LeadershipMessageRow>(
            r#"
            UPDATE leadership_messages SET
                person_name = COALESCE($2, person_name),
                person_title = COALESCE($3, person_title),
                position = COALESCE($4, position),
                message_content = COALESCE($5, message_content),
                photo_url = CASE WHEN $6::text IS NULL THEN photo_url ELSE NULLIF($6, '') END,
                is_active = COALESCE($7, is_active),
                display_order = COALESCE($8, display_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("person_name", patch.person_name)?)
        .bind(patch_required("person_title", patch.person_title)?)
        .bind(position)
        .bind(patch_required("message_content", patch.message_content)?)
        .bind(patch_nullable(patch.photo_url))
        .bind(patch.is_active)
        .bind(patch.display_order)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Board members
// ────────────────────────────────────────────────────────────────────────────

pub struct BoardMembers;

#[derive(Debug, Deserialize)]
pub struct BoardMemberInput {
    pub name: String,
    pub position: String,
    pub board_type: String,
    #[serde(default)]
    pub bio: String,
    pub photo_url: Option<String>,
    pub social_links: Option<Value>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BoardMemberPatch {
    pub name: Option<String>,
    pub position: Option<String>,
    pub board_type: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub social_links: Option<Value>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// `social_links` is a `{ "linkedin": "https://..." }` style object.
pub fn validate_social_links(value: Option<Value>) -> Result<Option<Value>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => {
            if map.values().any(|v| !v.is_string()) {
                return Err(AppError::Validation(
                    "social_links values must be strings".to_string(),
                ));
            }
            Ok(Some(Value::Object(map)))
        }
        Some(_) => Err(AppError::Validation(
            "social_links must be a JSON object".to_string(),
        )),
    }
}

#[async_trait]
impl Resource for BoardMembers {
    const TABLE: &'static str = "board_members";
    const LABEL: &'static str = "Board member";
    const ORDER_BY: &'static str = "display_order ASC, name ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = BoardMemberRow;
    type Create = BoardMemberInput;
    type Patch = BoardMemberPatch;

    async fn insert(pool: &PgPool, input: BoardMemberInput) -> Result<BoardMemberRow, AppError> {
        let social_links =
            validate_social_links(input.social_links)?.unwrap_or_else(|| Value::Object(Default::default()));
        Ok(sqlx::query_as::<_, BoardMemberRow>(
            r#"
            INSERT INTO board_members
                (name, position, board_type, bio, photo_url, social_links, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6,
                    COALESCE($7, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM board_members)),
                    COALESCE($8, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("name", &input.name)?)
        .bind(required("position", &input.position)?)
        .bind(one_of("board_type", &input.board_type, BOARD_TYPES)?)
        .bind(input.bio.trim())
        .bind(optional(input.photo_url))
        .bind(social_links)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: BoardMemberPatch,
    ) -> Result<Option<BoardMemberRow>, AppError> {
        let board_type = patch
            .board_type
            .map(|b| one_of("board_type", &b, BOARD_TYPES))
            .transpose()?;
        Ok(sqlx::query_as::<_, BoardMemberRow>(
            r#"
            UPDATE board_members SET
                name = COALESCE($2, name),
                position = COALESCE($3, position),
                board_type = COALESCE($4, board_type),
                bio = COALESCE($5, bio),
                photo_url = CASE WHEN $6::text IS NULL THEN photo_url ELSE NULLIF($6, '') END,
                social_links = COALESCE($7, social_links),
                display_order = COALESCE($8, display_order),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("name", patch.name)?)
        .bind(patch_required("position", patch.position)?)
        .bind(board_type)
        .bind(patch.bio.map(|b| b.trim().to_string()))
        .bind(patch_nullable(patch.photo_url))
        .bind(validate_social_links(patch.social_links)?)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Testimonials
// ────────────────────────────────────────────────────────────────────────────

pub struct Testimonials;

#[derive(Debug, Deserialize)]
pub struct TestimonialInput {
    pub person_name: String,
    pub relation: String,
    pub quote: String,
    pub photo_url: Option<String>,
    pub rating: Option<i32>,
    pub status: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestimonialPatch {
    pub person_name: Option<String>,
    pub relation: Option<String>,
    pub quote: Option<String>,
    pub photo_url: Option<String>,
    pub rating: Option<i32>,
    /// Removes the rating; takes precedence over `rating`.
    #[serde(default)]
    pub clear_rating: bool,
    pub status: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

/// Visitor-submitted testimonial; always lands as pending and hidden.
#[derive(Debug, Deserialize)]
pub struct PublicTestimonialInput {
    pub person_name: String,
    pub relation: String,
    pub quote: String,
    pub rating: Option<i32>,
}

pub fn validate_rating(rating: Option<i32>) -> Result<Option<i32>, AppError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        )),
        other => Ok(other),
    }
}

#[async_trait]
impl Resource for Testimonials {
    const TABLE: &'static str = "testimonials";
    const LABEL: &'static str = "Testimonial";
    const ORDER_BY: &'static str = "display_order ASC, created_at DESC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active AND status = 'approved'");
    const ORDERED: bool = true;

    type Row = TestimonialRow;
    type Create = TestimonialInput;
    type Patch = TestimonialPatch;

    async fn insert(pool: &PgPool, input: TestimonialInput) -> Result<TestimonialRow, AppError> {
        let status = match input.status {
            Some(s) => one_of("status", &s, TESTIMONIAL_STATUSES)?,
            None => "approved".to_string(),
        };
        Ok(sqlx::query_as::<_, TestimonialRow>(
            r#"
            INSERT INTO testimonials
                (person_name, relation, quote, photo_url, rating, status, is_active, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, TRUE),
                    COALESCE($8, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM testimonials)))
            RETURNING *
            "#,
        )
        .bind(required("person_name", &input.person_name)?)
        .bind(required("relation", &input.relation)?)
        .bind(required("quote", &input.quote)?)
        .bind(optional(input.photo_url))
        .bind(validate_rating(input.rating)?)
        .bind(status)
        .bind(input.is_active)
        .bind(input.display_order)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: TestimonialPatch,
    ) -> Result<Option<TestimonialRow>, AppError> {
        let status = patch
            .status
            .map(|s| one_of("status", &s, TESTIMONIAL_STATUSES))
            .transpose()?;
        Ok(sqlx::query_as::<_, TestimonialRow>(
            r#"
            UPDATE testimonials SET
                person_name = COALESCE($2, person_name),
                relation = COALESCE($3, relation),
                quote = COALESCE($4, quote),
                photo_url = CASE WHEN $5::text IS NULL THEN photo_url ELSE NULLIF($5, '') END,
                rating = CASE WHEN $7 THEN NULL ELSE COALESCE($6, rating) END,
                status = COALESCE($8, status),
                is_active = COALESCE($9, is_active),
                display_order = COALESCE($10, display_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("person_name", patch.person_name)?)
        .bind(patch_required("relation", patch.relation)?)
        .bind(patch_required("quote", patch.quote)?)
        .bind(patch_nullable(patch.photo_url))
        .bind(validate_rating(patch.rating)?)
        .bind(patch.clear_rating)
        .bind(status)
        .bind(patch.is_active)
        .bind(patch.display_order)
        .fetch_optional(pool)
        .await?)
    }
}

pub async fn submit_testimonial(
    pool: &PgPool,
    input: PublicTestimonialInput,
) -> Result<TestimonialRow, AppError> {
    let row = sqlx::query_as::<_, TestimonialRow>(
        r#"
        INSERT INTO testimonials
            (person_name, relation, quote, rating, status, is_active, display_order)
        VALUES ($1, $2, $3, $4, 'pending', FALSE,
                (SELECT COALESCE(MAX(display_order), 0) + 1 FROM testimonials))
        RETURNING *
        "#,
    )
    .bind(min_chars("person_name", &input.person_name, 2)?)
    .bind(required("relation", &input.relation)?)
    .bind(min_chars("quote", &input.quote, 10)?)
    .bind(validate_rating(input.rating)?)
    .fetch_one(pool)
    .await?;
    info!("Visitor testimonial {} queued for review", row.id);
    Ok(row)
}

/// POST /api/v1/public/testimonials
pub async fn handle_submit_testimonial(
    State(state): State<AppState>,
    Json(input): Json<PublicTestimonialInput>,
) -> Result<(StatusCode, Json<TestimonialRow>), AppError> {
    let row = submit_testimonial(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_rating_bounds() {
        assert_eq!(validate_rating(None).unwrap(), None);
        assert_eq!(validate_rating(Some(5)).unwrap(), Some(5));
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
    }

    #[test]
    fn test_validate_social_links_requires_object() {
        assert!(validate_social_links(Some(json!({"linkedin": "https://x"}))).is_ok());
        assert!(validate_social_links(Some(json!(["https://x"]))).is_err());
        assert!(validate_social_links(Some(json!({"linkedin": 3}))).is_err());
        assert_eq!(validate_social_links(Some(Value::Null)).unwrap(), None);
    }

    #[test]
    fn test_leadership_positions() {
        assert_eq!(
            one_of("position", "Vice_Principal", LEADERSHIP_POSITIONS).unwrap(),
            "vice_principal"
        );
        assert!(one_of("position", "secretary", LEADERSHIP_POSITIONS).is_err());
    }
}
