use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HeroSlideRow {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
    pub button_text: String,
    pub button_link: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BreakingNewsRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub link_url: Option<String>,
    pub link_text: Option<String>,
    pub is_external: bool,
    pub priority: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeadershipMessageRow {
    pub id: Uuid,
    pub person_name: String,
    pub person_title: String,
    pub position: String,
    pub message_content: String,
    pub photo_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BoardMemberRow {
    pub id: Uuid,
    pub name: String,
    pub position: String,
    pub board_type: String,
    pub bio: String,
    pub photo_url: Option<String>,
    pub social_links: Value,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestimonialRow {
    pub id: Uuid,
    pub person_name: String,
    pub relation: String,
    pub quote: String,
    pub photo_url: Option<String>,
    pub rating: Option<i32>,
    pub status: String,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SchoolFeatureRow {
    pub id: Uuid,
    pub feature_title: String,
    pub feature_description: String,
    pub icon_name: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SchoolStatRow {
    pub id: Uuid,
    pub stat_label: String,
    pub stat_value: String,
    pub icon: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffCountsRow {
    pub id: Uuid,
    pub teaching_staff: i32,
    pub security_staff: i32,
    pub professional_staff: i32,
    pub guides_staff: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SocialLinkRow {
    pub id: Uuid,
    pub platform: String,
    pub url: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AcademicProgramRow {
    pub id: Uuid,
    pub program_title: String,
    pub short_description: String,
    pub detailed_description: String,
    pub duration: Option<String>,
    pub icon_image: Option<String>,
    pub subjects: Vec<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GalleryPhotoRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub category: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub is_featured: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NewsPostRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub author: String,
    pub publication_date: DateTime<Utc>,
    pub is_published: bool,
    pub like_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NewsCommentRow {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub comment_text: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PageContentRow {
    pub id: Uuid,
    pub page_key: String,
    pub page_title: String,
    pub content: String,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactSubmissionRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub is_replied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Postal address card shown on the contact page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactAddressRow {
    pub id: Uuid,
    pub title: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Map or directions link shown on the contact page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactLocationRow {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContactPageContentRow {
    pub id: Uuid,
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub additional_data: Value,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
