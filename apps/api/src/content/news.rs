use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::content::resource::{conflict_on_unique, Resource};
use crate::errors::AppError;
use crate::models::content::{NewsCommentRow, NewsPostRow};
use crate::state::AppState;
use crate::validation::{email, min_chars, optional, patch_nullable, patch_required, required};

/// Lowercase ASCII alphanumerics; every run of anything else becomes one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn resolve_slug(explicit: Option<String>, title: &str) -> Result<String, AppError> {
    let source = optional(explicit).unwrap_or_else(|| title.to_string());
    let slug = slugify(&source);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(slug)
}

// ────────────────────────────────────────────────────────────────────────────
// News posts
// ────────────────────────────────────────────────────────────────────────────

pub struct NewsPosts;

#[derive(Debug, Deserialize)]
pub struct NewsPostInput {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub author: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsPostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub author: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub is_published: Option<bool>,
}

#[async_trait]
impl Resource for NewsPosts {
    const TABLE: &'static str = "news_posts";
    const LABEL: &'static str = "News post";
    const ORDER_BY: &'static str = "publication_date DESC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_published");

    type Row = NewsPostRow;
    type Create = NewsPostInput;
    type Patch = NewsPostPatch;

    async fn insert(pool: &PgPool, input: NewsPostInput) -> Result<NewsPostRow, AppError> {
        let title = required("title", &input.title)?;
        let slug = resolve_slug(input.slug, &title)?;
        let row = sqlx::query_as::<_, NewsPostRow>(
            r#"
            INSERT INTO news_posts
                (title, slug, excerpt, content, featured_image, author,
                 publication_date, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), COALESCE($8, FALSE))
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&slug)
        .bind(input.excerpt.trim())
        .bind(required("content", &input.content)?)
        .bind(optional(input.featured_image))
        .bind(required("author", &input.author)?)
        .bind(input.publication_date)
        .bind(input.is_published)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("A post with slug '{slug}' already exists")))?;
        info!("Created news post {} ({})", row.id, row.slug);
        Ok(row)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: NewsPostPatch,
    ) -> Result<Option<NewsPostRow>, AppError> {
        // An explicit slug wins; a blank one re-derives from the (new) title.
        let title = patch_required("title", patch.title)?;
        let slug = match patch.slug {
            Some(s) if s.trim().is_empty() => match &title {
                Some(t) => Some(resolve_slug(None, t)?),
                None => None,
            },
            Some(s) => Some(resolve_slug(Some(s), "")?),
            None => None,
        };
        let conflict_slug = slug.clone().unwrap_or_default();
        sqlx::query_as::<_, NewsPostRow>(
            r#"
            UPDATE news_posts SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                excerpt = COALESCE($4, excerpt),
                content = COALESCE($5, content),
                featured_image = CASE WHEN $6::text IS NULL THEN featured_image
                                      ELSE NULLIF($6, '') END,
                author = COALESCE($7, author),
                publication_date = COALESCE($8, publication_date),
                is_published = COALESCE($9, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(patch.excerpt.map(|e| e.trim().to_string()))
        .bind(patch_required("content", patch.content)?)
        .bind(patch_nullable(patch.featured_image))
        .bind(patch_required("author", patch.author)?)
        .bind(patch.publication_date)
        .bind(patch.is_published)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("A post with slug '{conflict_slug}' already exists")
            })
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Comments (moderated)
// ────────────────────────────────────────────────────────────────────────────

pub struct NewsComments;

/// Comments only enter through the public endpoint.
#[derive(Debug, Deserialize)]
pub struct NewsCommentCreate {}

#[derive(Debug, Default, Deserialize)]
pub struct NewsCommentPatch {
    pub is_approved: Option<bool>,
}

#[async_trait]
impl Resource for NewsComments {
    const TABLE: &'static str = "news_comments";
    const LABEL: &'static str = "News comment";
    const ORDER_BY: &'static str = "created_at DESC";

    type Row = NewsCommentRow;
    type Create = NewsCommentCreate;
    type Patch = NewsCommentPatch;

    async fn insert(_pool: &PgPool, _input: NewsCommentCreate) -> Result<NewsCommentRow, AppError> {
        Err(AppError::Validation(
            "Comments are submitted through the public news page".to_string(),
        ))
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: NewsCommentPatch,
    ) -> Result<Option<NewsCommentRow>, AppError> {
        Ok(sqlx::query_as::<_, NewsCommentRow>(
            r#"
            UPDATE news_comments SET
                is_approved = COALESCE($2, is_approved),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.is_approved)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public news endpoints
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NewsArticle {
    #[serde(flatten)]
    pub post: NewsPostRow,
    pub comments: Vec<NewsCommentRow>,
}

#[derive(Debug, Deserialize)]
pub struct NewCommentRequest {
    pub author_name: String,
    pub author_email: String,
    pub comment_text: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub id: Uuid,
    pub like_count: i32,
}

pub async fn find_published_by_slug(pool: &PgPool, slug: &str) -> Result<NewsArticle, AppError> {
    let post = sqlx::query_as::<_, NewsPostRow>(
        "SELECT * FROM news_posts WHERE slug = $1 AND is_published",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("News post '{slug}' not found")))?;

    let comments = sqlx::query_as::<_, NewsCommentRow>(
        "SELECT * FROM news_comments WHERE article_id = $1 AND is_approved ORDER BY created_at ASC",
    )
    .bind(post.id)
    .fetch_all(pool)
    .await?;

    Ok(NewsArticle { post, comments })
}

pub async fn like_post(pool: &PgPool, id: Uuid) -> Result<i32, AppError> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE news_posts SET like_count = like_count + 1 WHERE id = $1 AND is_published RETURNING like_count",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("News post {id} not found")))
}

pub async fn add_comment(
    pool: &PgPool,
    article_id: Uuid,
    req: NewCommentRequest,
) -> Result<NewsCommentRow, AppError> {
    let author_name = min_chars("author_name", &req.author_name, 2)?;
    let author_email = email("author_email", &req.author_email)?;
    let comment_text = required("comment_text", &req.comment_text)?;

    let published: Option<bool> =
        sqlx::query_scalar("SELECT is_published FROM news_posts WHERE id = $1")
            .bind(article_id)
            .fetch_optional(pool)
            .await?;
    if published != Some(true) {
        return Err(AppError::NotFound(format!("News post {article_id} not found")));
    }

    let row = sqlx::query_as::<_, NewsCommentRow>(
        r#"
        INSERT INTO news_comments (article_id, author_name, author_email, comment_text, is_approved)
        VALUES ($1, $2, $3, $4, FALSE)
        RETURNING *
        "#,
    )
    .bind(article_id)
    .bind(author_name)
    .bind(author_email)
    .bind(comment_text)
    .fetch_one(pool)
    .await?;
    info!("Comment {} awaiting moderation on post {article_id}", row.id);
    Ok(row)
}

/// GET /api/v1/public/news/:post (by slug)
pub async fn handle_get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<NewsArticle>, AppError> {
    Ok(Json(find_published_by_slug(&state.db, &slug).await?))
}

/// POST /api/v1/public/news/:post/like
pub async fn handle_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeResponse>, AppError> {
    let like_count = like_post(&state.db, id).await?;
    Ok(Json(LikeResponse { id, like_count }))
}

/// POST /api/v1/public/news/:post/comments
pub async fn handle_add_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<NewsCommentRow>), AppError> {
    let row = add_comment(&state.db, id, req).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("Annual Sports Day 2024!"), "annual-sports-day-2024");
        assert_eq!(slugify("  --Hello,   World--  "), "hello-world");
        assert_eq!(slugify("Café & Co."), "caf-co");
    }

    #[test]
    fn test_resolve_slug_prefers_explicit() {
        assert_eq!(resolve_slug(Some("My Slug".into()), "Title").unwrap(), "my-slug");
        assert_eq!(resolve_slug(Some("  ".into()), "Science Fair").unwrap(), "science-fair");
        assert!(resolve_slug(None, "!!!").is_err());
    }

    fn post(title: &str, slug: Option<&str>) -> NewsPostInput {
        NewsPostInput {
            title: title.into(),
            slug: slug.map(Into::into),
            excerpt: String::new(),
            content: "Students of all classes took part.".into(),
            featured_image: None,
            author: "Principal".into(),
            publication_date: None,
            is_published: Some(true),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_duplicate_slug_conflicts(pool: PgPool) {
        let first = NewsPosts::insert(&pool, post("Sports Day 2025", None))
            .await
            .unwrap();
        assert_eq!(first.slug, "sports-day-2025");

        let err = NewsPosts::insert(&pool, post("Sports day results", Some("Sports Day 2025")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let second = NewsPosts::insert(&pool, post("Science Fair", None))
            .await
            .unwrap();
        let err = NewsPosts::update(
            &pool,
            second.id,
            NewsPostPatch {
                slug: Some("sports-day-2025".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
