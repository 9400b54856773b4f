use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::admissions::repository::{
    application_stats, delete_applications, fetch_application, list_applications, lock_status,
    write_status, ApplicationFilter, ApplicationStats, Schedule,
};
use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::models::admissions::{Application, ApplicationStatus, ApplicationSummary, FormType};
use crate::state::AppState;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub form_type: Option<FormType>,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationPage {
    pub items: Vec<ApplicationSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
    pub interview_date: Option<NaiveDate>,
    pub interview_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteItem {
    pub form_type: FormType,
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub items: Vec<BulkDeleteItem>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// `(page, per_page)` clamped: page ≥ 1, 1 ≤ per_page ≤ 100.
pub fn paging(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Decides the schedule that goes with a status change.
///
/// Shortlisting (or rescheduling) needs both date and time; going back to
/// review clears the schedule; every other move keeps it.
pub fn plan_status_change(
    current: ApplicationStatus,
    current_schedule: Schedule,
    req: &StatusUpdateRequest,
) -> Result<Schedule, AppError> {
    if !current.can_transition_to(req.status) {
        return Err(AppError::UnprocessableEntity(format!(
            "Cannot move an application from {} to {}",
            current.label(),
            req.status.label()
        )));
    }
    match req.status {
        ApplicationStatus::ShortlistedForInterview => {
            let time = req
                .interview_time
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty());
            match (req.interview_date, time) {
                (Some(date), Some(time)) => Ok((Some(date), Some(time.to_string()))),
                _ => Err(AppError::Validation(
                    "interview_date and interview_time are required to shortlist".to_string(),
                )),
            }
        }
        ApplicationStatus::UnderReview => Ok((None, None)),
        _ => Ok(current_schedule),
    }
}

/// GET /api/v1/admin/applications
pub async fn handle_list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApplicationPage>, AppError> {
    let (page, per_page) = paging(query.page, query.per_page);
    let filter = ApplicationFilter {
        form_type: query.form_type,
        status: query.status,
        search: query.search,
    };
    let (items, total) =
        list_applications(&state.db, &filter, per_page, (page - 1) * per_page).await?;
    Ok(Json(ApplicationPage {
        items,
        total,
        page,
        per_page,
    }))
}

/// GET /api/v1/admin/applications/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApplicationStats>, AppError> {
    Ok(Json(application_stats(&state.db).await?))
}

/// GET /api/v1/admin/applications/:form_type/:id
pub async fn handle_detail(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((form_type, id)): Path<(FormType, Uuid)>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(fetch_application(&state.db, form_type, id).await?))
}

/// PATCH /api/v1/admin/applications/:form_type/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((form_type, id)): Path<(FormType, Uuid)>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Application>, AppError> {
    let mut tx = state.db.begin().await?;
    let (current, schedule) = lock_status(&mut tx, form_type, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{form_type} application {id} not found")))?;
    let current: ApplicationStatus = current
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;

    let schedule = plan_status_change(current, schedule, &req)?;
    write_status(&mut tx, form_type, id, req.status, &schedule).await?;
    tx.commit().await?;

    info!(
        "{} moved {form_type} application {id} from {current} to {}",
        admin.email, req.status
    );
    Ok(Json(fetch_application(&state.db, form_type, id).await?))
}

/// DELETE /api/v1/admin/applications/:form_type/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((form_type, id)): Path<(FormType, Uuid)>,
) -> Result<StatusCode, AppError> {
    let deleted = delete_applications(&state.db, &[(form_type, id)]).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!(
            "{form_type} application {id} not found"
        )));
    }
    info!("{} deleted {form_type} application {id}", admin.email);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/applications/bulk-delete
pub async fn handle_bulk_delete(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, AppError> {
    if req.items.is_empty() {
        return Err(AppError::Validation("items must not be empty".to_string()));
    }
    let items: Vec<(FormType, Uuid)> = req.items.iter().map(|i| (i.form_type, i.id)).collect();
    let deleted = delete_applications(&state.db, &items).await?;
    info!("{} bulk-deleted {deleted} applications", admin.email);
    Ok(Json(BulkDeleteResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
    }

    fn request(status: ApplicationStatus, date: Option<NaiveDate>, time: Option<&str>) -> StatusUpdateRequest {
        StatusUpdateRequest {
            status,
            interview_date: date,
            interview_time: time.map(str::to_string),
        }
    }

    #[test]
    fn test_shortlisting_needs_date_and_time() {
        let err = plan_status_change(Submitted, (None, None), &request(ShortlistedForInterview, Some(date()), None))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = plan_status_change(
            Submitted,
            (None, None),
            &request(ShortlistedForInterview, Some(date()), Some("  ")),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let schedule = plan_status_change(
            UnderReview,
            (None, None),
            &request(ShortlistedForInterview, Some(date()), Some(" 10:30 AM ")),
        )
        .unwrap();
        assert_eq!(schedule, (Some(date()), Some("10:30 AM".to_string())));
    }

    #[test]
    fn test_back_to_review_clears_schedule() {
        let schedule = plan_status_change(
            ShortlistedForInterview,
            (Some(date()), Some("10:30 AM".into())),
            &request(UnderReview, None, None),
        )
        .unwrap();
        assert_eq!(schedule, (None, None));
    }

    #[test]
    fn test_other_moves_keep_schedule() {
        let current = (Some(date()), Some("10:30 AM".to_string()));
        let schedule =
            plan_status_change(InterviewComplete, current.clone(), &request(Admitted, None, None)).unwrap();
        assert_eq!(schedule, current);
    }

    #[test]
    fn test_illegal_transition_is_unprocessable() {
        let err = plan_status_change(Submitted, (None, None), &request(Admitted, None, None)).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn test_paging_clamps() {
        assert_eq!(paging(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(paging(Some(0), Some(500)), (1, MAX_PER_PAGE));
        assert_eq!(paging(Some(3), Some(0)), (3, 1));
    }
}
