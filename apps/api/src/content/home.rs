use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::cache::HOME_BUNDLE_KEY;
use crate::content::events::list_upcoming;
use crate::content::news::NewsPosts;
use crate::content::people::{LeadershipMessages, Testimonials};
use crate::content::resource::{list_public, list_public_limited};
use crate::content::site::{
    find_page, BreakingNews, HeroSlides, SchoolFeatures, SchoolStats, SocialLinks,
};
use crate::errors::AppError;
use crate::models::content::{
    BreakingNewsRow, EventRow, HeroSlideRow, LeadershipMessageRow, NewsPostRow, PageContentRow,
    SchoolFeatureRow, SchoolStatRow, SocialLinkRow, StaffCountsRow, TestimonialRow,
};
use crate::state::AppState;

const HOME_NEWS_LIMIT: i64 = 6;
const HOME_EVENTS_LIMIT: i64 = 6;

/// Everything the landing page renders, fetched in one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeBundle {
    pub hero_slides: Vec<HeroSlideRow>,
    pub breaking_news: Vec<BreakingNewsRow>,
    pub school_features: Vec<SchoolFeatureRow>,
    pub school_stats: Vec<SchoolStatRow>,
    pub testimonials: Vec<TestimonialRow>,
    pub latest_news: Vec<NewsPostRow>,
    pub upcoming_events: Vec<EventRow>,
    pub social_links: Vec<SocialLinkRow>,
    pub leadership_messages: Vec<LeadershipMessageRow>,
    pub staff_counts: Option<StaffCountsRow>,
}

pub async fn load_home_bundle(pool: &PgPool) -> Result<HomeBundle, AppError> {
    let (
        hero_slides,
        breaking_news,
        school_features,
        school_stats,
        testimonials,
        latest_news,
        upcoming_events,
        social_links,
        leadership_messages,
    ) = tokio::try_join!(
        list_public::<HeroSlides>(pool),
        list_public::<BreakingNews>(pool),
        list_public::<SchoolFeatures>(pool),
        list_public::<SchoolStats>(pool),
        list_public::<Testimonials>(pool),
        list_public_limited::<NewsPosts>(pool, HOME_NEWS_LIMIT),
        list_upcoming(pool, HOME_EVENTS_LIMIT),
        list_public::<SocialLinks>(pool),
        list_public::<LeadershipMessages>(pool),
    )?;

    let staff_counts = sqlx::query_as::<_, StaffCountsRow>(
        "SELECT * FROM staff_counts ORDER BY created_at LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(HomeBundle {
        hero_slides,
        breaking_news,
        school_features,
        school_stats,
        testimonials,
        latest_news,
        upcoming_events,
        social_links,
        leadership_messages,
        staff_counts,
    })
}

/// GET /api/v1/public/home
pub async fn handle_home(State(state): State<AppState>) -> Result<Json<HomeBundle>, AppError> {
    if let Some(bundle) = state.cache.get::<HomeBundle>(HOME_BUNDLE_KEY).await {
        return Ok(Json(bundle));
    }
    let bundle = load_home_bundle(&state.db).await?;
    state.cache.put(HOME_BUNDLE_KEY, &bundle).await;
    info!(
        "Home bundle rebuilt: {} slides, {} news, {} events",
        bundle.hero_slides.len(),
        bundle.latest_news.len(),
        bundle.upcoming_events.len()
    );
    Ok(Json(bundle))
}

/// GET /api/v1/public/pages/:page_key
pub async fn handle_page(
    State(state): State<AppState>,
    Path(page_key): Path<String>,
) -> Result<Json<PageContentRow>, AppError> {
    Ok(Json(find_page(&state.db, &page_key).await?))
}
