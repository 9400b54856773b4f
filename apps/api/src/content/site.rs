use async_trait::async_trait;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::content::resource::{conflict_on_unique, Resource};
use crate::errors::AppError;
use crate::models::content::{
    BreakingNewsRow, HeroSlideRow, PageContentRow, SchoolFeatureRow, SchoolStatRow,
    SocialLinkRow, StaffCountsRow,
};
use crate::state::AppState;
use crate::validation::{
    http_url, non_negative, one_of, optional, patch_nullable, patch_required, required,
};

pub const SOCIAL_PLATFORMS: &[&str] = &[
    "facebook",
    "twitter",
    "instagram",
    "linkedin",
    "youtube",
    "whatsapp",
    "telegram",
    "other",
];

// ────────────────────────────────────────────────────────────────────────────
// Hero slides
// ────────────────────────────────────────────────────────────────────────────

pub struct HeroSlides;

#[derive(Debug, Deserialize)]
pub struct HeroSlideInput {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
    pub button_text: String,
    pub button_link: String,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HeroSlidePatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for HeroSlides {
    const TABLE: &'static str = "hero_slides";
    const LABEL: &'static str = "Hero slide";
    const ORDER_BY: &'static str = "display_order ASC, created_at DESC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = HeroSlideRow;
    type Create = HeroSlideInput;
    type Patch = HeroSlidePatch;

    async fn insert(pool: &PgPool, input: HeroSlideInput) -> Result<HeroSlideRow, AppError> {
        let row = sqlx::query_as::<_, HeroSlideRow>(
            r#"
            INSERT INTO hero_slides
                (title, subtitle, image_url, button_text, button_link, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5,
                    COALESCE($6, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM hero_slides)),
                    COALESCE($7, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("title", &input.title)?)
        .bind(required("subtitle", &input.subtitle)?)
        .bind(optional(input.image_url))
        .bind(required("button_text", &input.button_text)?)
        .bind(required("button_link", &input.button_link)?)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?;
        info!("Inserted hero slide {} at position {}", row.id, row.display_order);
        Ok(row)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: HeroSlidePatch,
    ) -> Result<Option<HeroSlideRow>, AppError> {
        Ok(sqlx::query_as::<_, HeroSlideRow>(
            r#"
            UPDATE hero_slides SET
                title = COALESCE($2, title),
                subtitle = COALESCE($3, subtitle),
                image_url = CASE WHEN $4::text IS NULL THEN image_url ELSE NULLIF($4, '') END,
                button_text = COALESCE($5, button_text),
                button_link = COALESCE($6, button_link),
                display_order = COALESCE($7, display_order),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("title", patch.title)?)
        .bind(patch_required("subtitle", patch.subtitle)?)
        .bind(patch_nullable(patch.image_url))
        .bind(patch_required("button_text", patch.button_text)?)
        .bind(patch_required("button_link", patch.button_link)?)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Breaking news ticker
// ────────────────────────────────────────────────────────────────────────────

pub struct BreakingNews;

#[derive(Debug, Deserialize)]
pub struct BreakingNewsInput {
    pub title: String,
    pub content: String,
    pub link_url: Option<String>,
    pub link_text: Option<String>,
    pub is_external: Option<bool>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BreakingNewsPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub link_url: Option<String>,
    pub link_text: Option<String>,
    pub is_external: Option<bool>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Removes the expiry; takes precedence over `expires_at`.
    #[serde(default)]
    pub clear_expires_at: bool,
}

#[async_trait]
impl Resource for BreakingNews {
    const TABLE: &'static str = "breaking_news";
    const LABEL: &'static str = "Breaking news";
    const ORDER_BY: &'static str = "priority DESC, created_at DESC";
    const PUBLIC_FILTER: Option<&'static str> =
        Some("is_active AND (expires_at IS NULL OR expires_at > NOW())");

    type Row = BreakingNewsRow;
    type Create = BreakingNewsInput;
    type Patch = BreakingNewsPatch;

    async fn insert(pool: &PgPool, input: BreakingNewsInput) -> Result<BreakingNewsRow, AppError> {
        if let Some(expires_at) = input.expires_at {
            if expires_at <= Utc::now() {
                return Err(AppError::Validation(
                    "expires_at must be in the future".to_string(),
                ));
            }
        }
        Ok(sqlx::query_as::<_, BreakingNewsRow>(
            r#"
            INSERT INTO breaking_news
                (title, content, link_url, link_text, is_external, priority, is_active, expires_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, FALSE), COALESCE($6, 1), COALESCE($7, TRUE), $8)
            RETURNING *
            "#,
        )
        .bind(required("title", &input.title)?)
        .bind(required("content", &input.content)?)
        .bind(optional(input.link_url))
        .bind(optional(input.link_text))
        .bind(input.is_external)
        .bind(input.priority)
        .bind(input.is_active)
        .bind(input.expires_at)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: BreakingNewsPatch,
    ) -> Result<Option<BreakingNewsRow>, AppError> {
        Ok(sqlx::query_as::<_, BreakingNewsRow>(
            r#"
            UPDATE breaking_news SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                link_url = CASE WHEN $4::text IS NULL THEN link_url ELSE NULLIF($4, '') END,
                link_text = CASE WHEN $5::text IS NULL THEN link_text ELSE NULLIF($5, '') END,
                is_external = COALESCE($6, is_external),
                priority = COALESCE($7, priority),
                is_active = COALESCE($8, is_active),
                expires_at = CASE WHEN $10 THEN NULL ELSE COALESCE($9, expires_at) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("title", patch.title)?)
        .bind(patch_required("content", patch.content)?)
        .bind(patch_nullable(patch.link_url))
        .bind(patch_nullable(patch.link_text))
        .bind(patch.is_external)
        .bind(patch.priority)
        .bind(patch.is_active)
        .bind(patch.expires_at)
        .bind(patch.clear_expires_at)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// "Why choose us" features
// ────────────────────────────────────────────────────────────────────────────

pub struct SchoolFeatures;

#[derive(Debug, Deserialize)]
pub struct SchoolFeatureInput {
    pub feature_title: String,
    pub feature_description: String,
    pub icon_name: String,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchoolFeaturePatch {
    pub feature_title: Option<String>,
    pub feature_description: Option<String>,
    pub icon_name: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for SchoolFeatures {
    const TABLE: &'static str = "school_features";
    const LABEL: &'static str = "School feature";
    const ORDER_BY: &'static str = "display_order ASC, feature_title ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = SchoolFeatureRow;
    type Create = SchoolFeatureInput;
    type Patch = SchoolFeaturePatch;

    async fn insert(pool: &PgPool, input: SchoolFeatureInput) -> Result<SchoolFeatureRow, AppError> {
        Ok(sqlx::query_as::<_, SchoolFeatureRow>(
            r#"
            INSERT INTO school_features
                (feature_title, feature_description, icon_name, display_order, is_active)
            VALUES ($1, $2, $3,
                    COALESCE($4, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM school_features)),
                    COALESCE($5, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("feature_title", &input.feature_title)?)
        .bind(required("feature_description", &input.feature_description)?)
        .bind(required("icon_name", &input.icon_name)?)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: SchoolFeaturePatch,
    ) -> Result<Option<SchoolFeatureRow>, AppError> {
        Ok(sqlx::query_as::<_, SchoolFeatureRow>(
            r#"
            UPDATE school_features SET
                feature_title = COALESCE($2, feature_title),
                feature_description = COALESCE($3, feature_description),
                icon_name = COALESCE($4, icon_name),
                display_order = COALESCE($5, display_order),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("feature_title", patch.feature_title)?)
        .bind(patch_required("feature_description", patch.feature_description)?)
        .bind(patch_required("icon_name", patch.icon_name)?)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Headline statistics ("1200+ students")
// ────────────────────────────────────────────────────────────────────────────

pub struct SchoolStats;

#[derive(Debug, Deserialize)]
pub struct SchoolStatInput {
    pub stat_label: String,
    pub stat_value: String,
    pub icon: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchoolStatPatch {
    pub stat_label: Option<String>,
    pub stat_value: Option<String>,
    pub icon: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for SchoolStats {
    const TABLE: &'static str = "school_stats";
    const LABEL: &'static str = "School stat";
    const ORDER_BY: &'static str = "display_order ASC, stat_label ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = SchoolStatRow;
    type Create = SchoolStatInput;
    type Patch = SchoolStatPatch;

    async fn insert(pool: &PgPool, input: SchoolStatInput) -> Result<SchoolStatRow, AppError> {
        Ok(sqlx::query_as::<_, SchoolStatRow>(
            r#"
            INSERT INTO school_stats (stat_label, stat_value, icon, display_order, is_active)
            VALUES ($1, $2, $3,
                    COALESCE($4, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM school_stats)),
                    COALESCE($5, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("stat_label", &input.stat_label)?)
        .bind(required("stat_value", &input.stat_value)?)
        .bind(optional(input.icon))
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: SchoolStatPatch,
    ) -> Result<Option<SchoolStatRow>, AppError> {
        Ok(sqlx::query_as::<_, SchoolStatRow>(
            r#"
            UPDATE school_stats SET
                stat_label = COALESCE($2, stat_label),
                stat_value = COALESCE($3, stat_value),
                icon = CASE WHEN $4::text IS NULL THEN icon ELSE NULLIF($4, '') END,
                display_order = COALESCE($5, display_order),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("stat_label", patch.stat_label)?)
        .bind(patch_required("stat_value", patch.stat_value)?)
        .bind(patch_nullable(patch.icon))
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Social media links (footer)
// ────────────────────────────────────────────────────────────────────────────

pub struct SocialLinks;

#[derive(Debug, Deserialize)]
pub struct SocialLinkInput {
    pub platform: String,
    pub url: String,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SocialLinkPatch {
    pub platform: Option<String>,
    pub url: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for SocialLinks {
    const TABLE: &'static str = "social_links";
    const LABEL: &'static str = "Social link";
    const ORDER_BY: &'static str = "display_order ASC, platform ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = SocialLinkRow;
    type Create = SocialLinkInput;
    type Patch = SocialLinkPatch;

    async fn insert(pool: &PgPool, input: SocialLinkInput) -> Result<SocialLinkRow, AppError> {
        Ok(sqlx::query_as::<_, SocialLinkRow>(
            r#"
            INSERT INTO social_links (platform, url, display_order, is_active)
            VALUES ($1, $2,
                    COALESCE($3, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM social_links)),
                    COALESCE($4, TRUE))
            RETURNING *
            "#,
        )
        .bind(one_of("platform", &input.platform, SOCIAL_PLATFORMS)?)
        .bind(http_url("url", &input.url)?)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: SocialLinkPatch,
    ) -> Result<Option<SocialLinkRow>, AppError> {
        let platform = patch
            .platform
            .map(|p| one_of("platform", &p, SOCIAL_PLATFORMS))
            .transpose()?;
        let url = patch.url.map(|u| http_url("url", &u)).transpose()?;
        Ok(sqlx::query_as::<_, SocialLinkRow>(
            r#"
            UPDATE social_links SET
                platform = COALESCE($2, platform),
                url = COALESCE($3, url),
                display_order = COALESCE($4, display_order),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(platform)
        .bind(url)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Free-form page sections (about_legacy, about_mission, ...)
// ────────────────────────────────────────────────────────────────────────────

pub struct PageContents;

#[derive(Debug, Deserialize)]
pub struct PageContentInput {
    pub page_key: String,
    pub page_title: String,
    pub content: String,
    pub meta_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageContentPatch {
    pub page_title: Option<String>,
    pub content: Option<String>,
    pub meta_description: Option<String>,
}

/// Page keys are lowercase identifiers: `about_mission`, `contact-hero`.
pub fn validate_page_key(key: &str) -> Result<String, AppError> {
    let key = required("page_key", key)?.to_ascii_lowercase();
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "page_key may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(key)
}

#[async_trait]
impl Resource for PageContents {
    const TABLE: &'static str = "page_content";
    const LABEL: &'static str = "Page content";
    const ORDER_BY: &'static str = "page_key ASC";

    type Row = PageContentRow;
    type Create = PageContentInput;
    type Patch = PageContentPatch;

    async fn insert(pool: &PgPool, input: PageContentInput) -> Result<PageContentRow, AppError> {
        let page_key = validate_page_key(&input.page_key)?;
        // Content may legitimately be empty while a section is drafted.
        sqlx::query_as::<_, PageContentRow>(
            r#"
            INSERT INTO page_content (page_key, page_title, content, meta_description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&page_key)
        .bind(required("page_title", &input.page_title)?)
        .bind(input.content)
        .bind(optional(input.meta_description))
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("Page key '{page_key}' already exists")))
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: PageContentPatch,
    ) -> Result<Option<PageContentRow>, AppError> {
        Ok(sqlx::query_as::<_, PageContentRow>(
            r#"
            UPDATE page_content SET
                page_title = COALESCE($2, page_title),
                content = COALESCE($3, content),
                meta_description = CASE WHEN $4::text IS NULL THEN meta_description
                                        ELSE NULLIF($4, '') END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("page_title", patch.page_title)?)
        .bind(patch.content)
        .bind(patch_nullable(patch.meta_description))
        .fetch_optional(pool)
        .await?)
    }
}

pub async fn find_page(pool: &PgPool, page_key: &str) -> Result<PageContentRow, AppError> {
    let key = validate_page_key(page_key)?;
    sqlx::query_as::<_, PageContentRow>("SELECT * FROM page_content WHERE page_key = $1")
        .bind(&key)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Page '{key}' not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Staff counts (single row)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StaffCountsInput {
    pub teaching_staff: i32,
    pub security_staff: i32,
    pub professional_staff: i32,
    pub guides_staff: i32,
}

pub async fn get_staff_counts(pool: &PgPool) -> Result<StaffCountsRow, AppError> {
    sqlx::query_as::<_, StaffCountsRow>("SELECT * FROM staff_counts ORDER BY created_at LIMIT 1")
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff counts have not been set up".to_string()))
}

/// Upserts the single staff-counts row. The `singleton` unique column makes
/// concurrent first saves converge on one row.
pub async fn save_staff_counts(
    pool: &PgPool,
    input: &StaffCountsInput,
) -> Result<StaffCountsRow, AppError> {
    let teaching = non_negative("teaching_staff", input.teaching_staff)?;
    let security = non_negative("security_staff", input.security_staff)?;
    let professional = non_negative("professional_staff", input.professional_staff)?;
    let guides = non_negative("guides_staff", input.guides_staff)?;

    Ok(sqlx::query_as::<_, StaffCountsRow>(
        r#"
        INSERT INTO staff_counts
            (teaching_staff, security_staff, professional_staff, guides_staff)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (singleton) DO UPDATE SET
            teaching_staff = EXCLUDED.teaching_staff,
            security_staff = EXCLUDED.security_staff,
            professional_staff = EXCLUDED.professional_staff,
            guides_staff = EXCLUDED.guides_staff,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(teaching)
    .bind(security)
    .bind(professional)
    .bind(guides)
    .fetch_one(pool)
    .await?)
}

/// GET /api/v1/public/staff-counts
pub async fn handle_get_staff_counts(
    State(state): State<AppState>,
) -> Result<Json<StaffCountsRow>, AppError> {
    Ok(Json(get_staff_counts(&state.db).await?))
}

/// PUT /api/v1/admin/staff-counts
pub async fn handle_put_staff_counts(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(input): Json<StaffCountsInput>,
) -> Result<Json<StaffCountsRow>, AppError> {
    let row = save_staff_counts(&state.db, &input).await?;
    state.cache.invalidate_public().await;
    info!("{} updated staff counts", admin.email);
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_validation() {
        assert_eq!(validate_page_key(" About_Mission ").unwrap(), "about_mission");
        assert!(validate_page_key("about mission").is_err());
        assert!(validate_page_key("").is_err());
    }

    fn counts(teaching: i32) -> StaffCountsInput {
        StaffCountsInput {
            teaching_staff: teaching,
            security_staff: 4,
            professional_staff: 6,
            guides_staff: 2,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_concurrent_first_saves_keep_one_row(pool: PgPool) {
        let (first, second) = (counts(40), counts(45));
        let (a, b) = tokio::join!(
            save_staff_counts(&pool, &first),
            save_staff_counts(&pool, &second),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff_counts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let saved = save_staff_counts(&pool, &counts(50)).await.unwrap();
        assert_eq!(saved.id, a.id);
        assert_eq!(get_staff_counts(&pool).await.unwrap().teaching_staff, 50);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_duplicate_page_key_conflicts(pool: PgPool) {
        let page = || PageContentInput {
            page_key: "about_mission".into(),
            page_title: "Our Mission".into(),
            content: "Educating for life.".into(),
            meta_description: None,
        };
        PageContents::insert(&pool, page()).await.unwrap();
        let err = PageContents::insert(&pool, page()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_reorder_with_unknown_id_changes_nothing(pool: PgPool) {
        use crate::content::resource::{list_all, reorder};

        let mut ids = Vec::new();
        for title in ["Welcome", "Admissions open", "Sports day"] {
            let slide = HeroSlides::insert(
                &pool,
                HeroSlideInput {
                    title: title.into(),
                    subtitle: "Modern HSS".into(),
                    image_url: None,
                    button_text: "Read more".into(),
                    button_link: "/about".into(),
                    display_order: None,
                    is_active: None,
                },
            )
            .await
            .unwrap();
            ids.push(slide.id);
        }

        let err = reorder::<HeroSlides>(&pool, &[ids[2], Uuid::new_v4(), ids[0]])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let order: Vec<_> = list_all::<HeroSlides>(&pool)
            .await
            .unwrap()
            .iter()
            .map(|s| (s.id, s.display_order))
            .collect();
        assert_eq!(order, vec![(ids[0], 1), (ids[1], 2), (ids[2], 3)]);

        reorder::<HeroSlides>(&pool, &[ids[2], ids[0], ids[1]])
            .await
            .unwrap();
        let titles: Vec<_> = list_all::<HeroSlides>(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, ["Sports day", "Welcome", "Admissions open"]);
    }

    #[test]
    fn test_social_platforms_cover_footer_icons() {
        for platform in ["facebook", "instagram", "youtube", "whatsapp"] {
            assert!(one_of("platform", platform, SOCIAL_PLATFORMS).is_ok());
        }
    }
}
