use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::models::admissions::{AdmissionFormRow, FormType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateFormRequest {
    pub is_active: bool,
    pub academic_year: String,
}

/// `YYYY-YY` where the suffix is the following year, e.g. `2025-26`.
pub fn validate_academic_year(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    let invalid = || {
        AppError::Validation(
            "academic_year must look like 2025-26 (start year, then the next year's last two digits)"
                .to_string(),
        )
    };
    let (start, end) = trimmed.split_once('-').ok_or_else(invalid)?;
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if start.len() != 4 || end.len() != 2 || !all_digits(start) || !all_digits(end) {
        return Err(invalid());
    }
    let start: u32 = start.parse().map_err(|_| invalid())?;
    let end: u32 = end.parse().map_err(|_| invalid())?;
    if (start + 1) % 100 != end {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

pub async fn list_forms(pool: &PgPool) -> Result<Vec<AdmissionFormRow>, AppError> {
    Ok(
        sqlx::query_as::<_, AdmissionFormRow>("SELECT * FROM admission_forms ORDER BY form_type")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn find_form(
    pool: &PgPool,
    form_type: FormType,
) -> Result<Option<AdmissionFormRow>, AppError> {
    Ok(
        sqlx::query_as::<_, AdmissionFormRow>("SELECT * FROM admission_forms WHERE form_type = $1")
            .bind(form_type.as_str())
            .fetch_optional(pool)
            .await?,
    )
}

/// 422 unless the form for `form_type` exists and is open.
pub async fn ensure_form_open(pool: &PgPool, form_type: FormType) -> Result<(), AppError> {
    match find_form(pool, form_type).await? {
        Some(form) if form.is_active => Ok(()),
        _ => Err(AppError::UnprocessableEntity(format!(
            "Admissions are closed for {}",
            form_type.label()
        ))),
    }
}

pub async fn upsert_form(
    pool: &PgPool,
    form_type: FormType,
    req: &UpdateFormRequest,
) -> Result<AdmissionFormRow, AppError> {
    let academic_year = validate_academic_year(&req.academic_year)?;
    Ok(sqlx::query_as::<_, AdmissionFormRow>(
        r#"
        INSERT INTO admission_forms (form_type, is_active, academic_year)
        VALUES ($1, $2, $3)
        ON CONFLICT (form_type) DO UPDATE
            SET is_active = EXCLUDED.is_active,
                academic_year = EXCLUDED.academic_year,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(form_type.as_str())
    .bind(req.is_active)
    .bind(academic_year)
    .fetch_one(pool)
    .await?)
}

/// GET /api/v1/admissions/forms
pub async fn handle_list_forms(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdmissionFormRow>>, AppError> {
    Ok(Json(list_forms(&state.db).await?))
}

/// PUT /api/v1/admin/admission-forms/:form_type
pub async fn handle_update_form(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(form_type): Path<FormType>,
    Json(req): Json<UpdateFormRequest>,
) -> Result<Json<AdmissionFormRow>, AppError> {
    let form = upsert_form(&state.db, form_type, &req).await?;
    info!(
        "{} set {form_type} admissions active={} for {}",
        admin.email, form.is_active, form.academic_year
    );
    Ok(Json(form))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_year_format() {
        assert_eq!(validate_academic_year(" 2025-26 ").unwrap(), "2025-26");
        assert!(validate_academic_year("2099-00").is_ok());
        assert!(validate_academic_year("2025-27").is_err());
        assert!(validate_academic_year("2025/26").is_err());
        assert!(validate_academic_year("25-26").is_err());
        assert!(validate_academic_year("2025-2026").is_err());
    }
}
