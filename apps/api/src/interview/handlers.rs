use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::admissions::repository::{fetch_application, status_of};
use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::interview::marks::{build_mark_sheet, validate_entries, MarkSheet, SubjectMarkInput};
use crate::interview::templates::{
    list_grouped, list_templates, load_marks, replace_templates, store_marks,
    ReplaceTemplatesRequest,
};
use crate::models::admissions::{ApplicationStatus, FormType, InterviewTemplateRow};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InterviewMarksResponse {
    pub application_id: Uuid,
    pub form_type: FormType,
    pub application_number: String,
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub sheet: MarkSheet,
}

#[derive(Debug, Deserialize)]
pub struct SaveMarksRequest {
    pub marks: Vec<SubjectMarkInput>,
    #[serde(default)]
    pub complete_interview: bool,
}

/// GET /api/v1/admin/interview-templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<BTreeMap<FormType, Vec<InterviewTemplateRow>>>, AppError> {
    Ok(Json(list_grouped(&state.db).await?))
}

/// PUT /api/v1/admin/interview-templates/:form_type
pub async fn handle_replace_templates(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(form_type): Path<FormType>,
    Json(req): Json<ReplaceTemplatesRequest>,
) -> Result<Json<Vec<InterviewTemplateRow>>, AppError> {
    let rows = replace_templates(&state.db, form_type, req.subjects).await?;
    info!("{} updated {form_type} interview subjects", admin.email);
    Ok(Json(rows))
}

async fn marks_response(
    state: &AppState,
    form_type: FormType,
    id: Uuid,
) -> Result<InterviewMarksResponse, AppError> {
    let application = fetch_application(&state.db, form_type, id).await?;
    let status = status_of(&application)?;
    let templates = list_templates(&state.db, form_type).await?;
    let marks = load_marks(&state.db, form_type, id).await?;
    Ok(InterviewMarksResponse {
        application_id: id,
        form_type,
        application_number: application.application_number().to_string(),
        status,
        sheet: build_mark_sheet(&templates, &marks),
    })
}

/// GET /api/v1/admin/applications/:form_type/:id/interview-marks
pub async fn handle_get_marks(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((form_type, id)): Path<(FormType, Uuid)>,
) -> Result<Json<InterviewMarksResponse>, AppError> {
    Ok(Json(marks_response(&state, form_type, id).await?))
}

/// PUT /api/v1/admin/applications/:form_type/:id/interview-marks
pub async fn handle_save_marks(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((form_type, id)): Path<(FormType, Uuid)>,
    Json(req): Json<SaveMarksRequest>,
) -> Result<Json<InterviewMarksResponse>, AppError> {
    let templates = list_templates(&state.db, form_type).await?;
    let entries = validate_entries(&templates, req.marks)?;
    let status = store_marks(&state.db, form_type, id, &entries, req.complete_interview).await?;
    info!(
        "{} saved {} interview marks for {form_type} application {id} ({status})",
        admin.email,
        entries.len()
    );

    Ok(Json(marks_response(&state, form_type, id).await?))
}
