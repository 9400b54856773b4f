use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::content::resource::Resource;
use crate::errors::AppError;
use crate::models::content::ContactSubmissionRow;
use crate::state::AppState;
use crate::validation::{email, min_chars, optional, phone_digits, required};

pub struct ContactSubmissions;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

/// Admin follow-up flags; the visitor's message itself is immutable.
#[derive(Debug, Default, Deserialize)]
pub struct ContactSubmissionPatch {
    pub is_read: Option<bool>,
    pub is_replied: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ContactReceipt {
    pub id: Uuid,
    pub message: String,
}

#[async_trait]
impl Resource for ContactSubmissions {
    const TABLE: &'static str = "contact_submissions";
    const LABEL: &'static str = "Contact submission";
    const ORDER_BY: &'static str = "created_at DESC";

    type Row = ContactSubmissionRow;
    type Create = ContactRequest;
    type Patch = ContactSubmissionPatch;

    async fn insert(pool: &PgPool, input: ContactRequest) -> Result<ContactSubmissionRow, AppError> {
        let phone = optional(input.phone)
            .map(|p| phone_digits("phone", &p, 10))
            .transpose()?;
        let row = sqlx::query_as::<_, ContactSubmissionRow>(
            r#"
            INSERT INTO contact_submissions (name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(min_chars("name", &input.name, 2)?)
        .bind(email("email", &input.email)?)
        .bind(phone)
        .bind(required("subject", &input.subject)?)
        .bind(min_chars("message", &input.message, 10)?)
        .fetch_one(pool)
        .await?;
        info!("Contact submission {} received", row.id);
        Ok(row)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: ContactSubmissionPatch,
    ) -> Result<Option<ContactSubmissionRow>, AppError> {
        Ok(sqlx::query_as::<_, ContactSubmissionRow>(
            r#"
            UPDATE contact_submissions SET
                is_read = COALESCE($2, is_read),
                is_replied = COALESCE($3, is_replied),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.is_read)
        .bind(patch.is_replied)
        .fetch_optional(pool)
        .await?)
    }
}

/// POST /api/v1/public/contact
pub async fn handle_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactReceipt>), AppError> {
    let row = ContactSubmissions::insert(&state.db, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContactReceipt {
            id: row.id,
            message: "Thank you for contacting us. We will get back to you soon.".to_string(),
        }),
    ))
}
