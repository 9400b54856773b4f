use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::admissions::forms::find_form;
use crate::admissions::repository::{find_by_number_and_mobile, status_of};
use crate::errors::AppError;
use crate::interview::marks::{build_mark_sheet, MarkSheet};
use crate::interview::templates::{list_templates, load_marks};
use crate::models::admissions::{Application, ApplicationStatus, FormType};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    #[serde(default)]
    pub application_number: String,
    #[serde(default)]
    pub mobile_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackStep {
    pub key: ApplicationStatus,
    pub label: &'static str,
    pub description: &'static str,
    pub completed: bool,
    pub current: bool,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub application: Map<String, Value>,
    pub application_type: FormType,
    pub academic_year: Option<String>,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub progress: u32,
    pub steps: Vec<TrackStep>,
    pub show_interview_letter: bool,
    pub show_mark_list: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_marks: Option<MarkSheet>,
}

/// Trimmed number and digits-only mobile; 400 when either is blank.
pub fn normalize_lookup(req: &TrackRequest) -> Result<(String, String), AppError> {
    let number = req.application_number.trim();
    let mobile: String = req
        .mobile_number
        .chars()
        .filter(|c| !matches!(c, ' ' | '+' | '-' | '(' | ')'))
        .collect();
    if number.is_empty() || mobile.is_empty() {
        return Err(AppError::Validation(
            "application_number and mobile_number are required".to_string(),
        ));
    }
    Ok((number.to_string(), mobile))
}

/// Percentage through the six-step pipeline, rounded.
pub fn progress_percent(status: ApplicationStatus) -> u32 {
    let steps = ApplicationStatus::PIPELINE.len() as f64;
    ((status.pipeline_index() as f64 + 1.0) / steps * 100.0).round() as u32
}

pub fn build_steps(status: ApplicationStatus) -> Vec<TrackStep> {
    let current = status.pipeline_index();
    ApplicationStatus::PIPELINE
        .iter()
        .enumerate()
        .map(|(idx, step)| TrackStep {
            key: *step,
            label: step.label(),
            description: step.description(),
            // A rejected applicant never passed through "admitted".
            completed: idx <= current
                && !(status == ApplicationStatus::NotAdmitted
                    && *step == ApplicationStatus::Admitted),
            current: idx == current,
        })
        .collect()
}

/// The application as a JSON object with null fields removed.
pub fn public_fields(application: &Application) -> Result<Map<String, Value>, AppError> {
    let value = serde_json::to_value(application)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize application: {e}")))?;
    let Value::Object(map) = value else {
        return Ok(Map::new());
    };
    Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
}

/// Looks an application up by number and mobile; 404 when nothing matches.
pub async fn locate_application(pool: &PgPool, req: &TrackRequest) -> Result<Application, AppError> {
    let (number, mobile) = normalize_lookup(req)?;
    find_by_number_and_mobile(pool, &number, &mobile)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))
}

pub async fn track(pool: &PgPool, req: &TrackRequest) -> Result<TrackResponse, AppError> {
    let application = locate_application(pool, req).await?;
    let form_type = application.form_type();
    let status = status_of(&application)?;
    let academic_year = find_form(pool, form_type).await?.map(|f| f.academic_year);

    let show_mark_list = status.shows_mark_list();
    let interview_marks = if show_mark_list {
        let templates = list_templates(pool, form_type).await?;
        let marks = load_marks(pool, form_type, application.id()).await?;
        Some(build_mark_sheet(&templates, &marks))
    } else {
        None
    };

    Ok(TrackResponse {
        application: public_fields(&application)?,
        application_type: form_type,
        academic_year,
        status,
        status_label: status.label(),
        progress: progress_percent(status),
        steps: build_steps(status),
        show_interview_letter: status == ApplicationStatus::ShortlistedForInterview
            && application.interview_date().is_some(),
        show_mark_list,
        interview_marks,
    })
}

/// POST /api/v1/admissions/track
pub async fn handle_track(
    State(state): State<AppState>,
    Json(req): Json<TrackRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    Ok(Json(track(&state.db, &req).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::admissions::KgStdApplicationRow;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(ApplicationStatus::Submitted), 17);
        assert_eq!(progress_percent(ApplicationStatus::ShortlistedForInterview), 50);
        assert_eq!(progress_percent(ApplicationStatus::Admitted), 83);
        assert_eq!(progress_percent(ApplicationStatus::NotAdmitted), 100);
    }

    #[test]
    fn test_steps_mark_current() {
        let steps = build_steps(ApplicationStatus::UnderReview);
        assert_eq!(steps.len(), 6);
        assert!(steps[0].completed && !steps[0].current);
        assert!(steps[1].completed && steps[1].current);
        assert!(!steps[2].completed);

        let rejected = build_steps(ApplicationStatus::NotAdmitted);
        assert!(!rejected[4].completed);
        assert!(rejected[5].current);
    }

    #[test]
    fn test_normalize_lookup() {
        let req = TrackRequest {
            application_number: " MHS2025-1234 ".into(),
            mobile_number: "+91 98470-12345".into(),
        };
        assert_eq!(
            normalize_lookup(&req).unwrap(),
            ("MHS2025-1234".to_string(), "919847012345".to_string())
        );
        let blank = TrackRequest {
            application_number: "MHS2025-1234".into(),
            mobile_number: "  ".into(),
        };
        assert!(normalize_lookup(&blank).is_err());
    }

    #[test]
    fn test_public_fields_drop_nulls() {
        let row = KgStdApplicationRow {
            id: Uuid::new_v4(),
            application_number: "MHS2025-1234".into(),
            full_name: "Aisha".into(),
            gender: "female".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2018, 6, 12).unwrap(),
            stage: "UKG".into(),
            need_madrassa: false,
            previous_madrassa: None,
            father_name: "Rahman".into(),
            mother_name: "Safiya".into(),
            house_name: "Noor".into(),
            post_office: "Edappal".into(),
            village: "Kalady".into(),
            pincode: "679576".into(),
            district: "Malappuram".into(),
            email: None,
            mobile_number: "9847012345".into(),
            previous_school: None,
            has_siblings: false,
            siblings_names: None,
            status: "submitted".into(),
            interview_date: None,
            interview_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let fields = public_fields(&Application::KgStd(row)).unwrap();
        assert_eq!(fields["form_type"], "kg_std");
        assert_eq!(fields["stage"], "UKG");
        assert!(!fields.contains_key("email"));
        assert!(!fields.contains_key("interview_date"));
    }
}
