use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::admissions::repository::status_of;
use crate::admissions::tracking::{locate_application, TrackRequest};
use crate::config::SchoolProfile;
use crate::errors::AppError;
use crate::models::admissions::{Application, ApplicationStatus, FormType};
use crate::state::AppState;
use crate::storage::put_object;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub filename: String,
    pub key: String,
    pub html: String,
}

/// Escapes text for interpolation into HTML.
fn esc(value: &str) -> String {
    ammonia::clean_text(value)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

pub fn document_key(application_number: &str, name: &str) -> String {
    format!("documents/{application_number}/{name}")
}

fn letterhead(school: &SchoolProfile) -> String {
    format!(
        r#"<div class="letterhead">
  <div class="school-name">{}</div>
  <div class="school-address">{}<br>{}</div>
</div>"#,
        esc(&school.name),
        esc(&school.address),
        esc(&school.contact)
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{}</title>
<style>
  body {{ font-family: 'Times New Roman', serif; margin: 40px; color: #000; line-height: 1.6; }}
  .letterhead {{ text-align: center; border-bottom: 3px solid #0066cc; padding-bottom: 20px; margin-bottom: 30px; }}
  .school-name {{ font-size: 28px; font-weight: bold; color: #0066cc; }}
  .school-address {{ font-size: 14px; color: #666; }}
  .title {{ font-size: 20px; font-weight: bold; margin: 30px 0; text-align: center; text-decoration: underline; }}
  .box {{ padding: 16px 20px; margin: 20px 0; border-left: 4px solid #0066cc; background: #f8f9fa; }}
  table.fields td {{ padding: 4px 12px 4px 0; vertical-align: top; }}
  table.fields td.label {{ font-weight: bold; width: 200px; }}
  .footer {{ margin-top: 40px; text-align: center; font-size: 12px; color: #666; }}
</style>
</head>
<body>
{}
<div class="footer">This is a computer-generated document. For any discrepancies, please contact the school office.</div>
</body>
</html>
"#,
        esc(title),
        body
    )
}

fn field_table(fields: &[(&str, String)]) -> String {
    let rows: String = fields
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><td class=\"label\">{}</td><td>{}</td></tr>\n",
                esc(label),
                esc(value)
            )
        })
        .collect();
    format!("<table class=\"fields\">\n{rows}</table>")
}

/// Label/value pairs printed on the application copy, nulls skipped.
pub fn application_fields(application: &Application) -> Vec<(&'static str, String)> {
    let mut fields: Vec<(&'static str, Option<String>)> = Vec::new();
    match application {
        Application::KgStd(a) => {
            fields.extend([
                ("Application No", Some(a.application_number.clone())),
                ("Full Name", Some(a.full_name.clone())),
                ("Gender", Some(a.gender.clone())),
                ("Date of Birth", Some(a.date_of_birth.format("%d-%m-%Y").to_string())),
                ("Stage", Some(a.stage.clone())),
                ("Madrassa Required", Some(yes_no(a.need_madrassa).to_string())),
                ("Previous Madrassa", a.previous_madrassa.clone()),
                ("Father's Name", Some(a.father_name.clone())),
                ("Mother's Name", Some(a.mother_name.clone())),
                ("House Name", Some(a.house_name.clone())),
                ("Post Office", Some(a.post_office.clone())),
                ("Village", Some(a.village.clone())),
                ("Pincode", Some(a.pincode.clone())),
                ("District", Some(a.district.clone())),
                ("Email", a.email.clone()),
                ("Mobile Number", Some(a.mobile_number.clone())),
                ("Previous School", a.previous_school.clone()),
                ("Siblings in School", Some(yes_no(a.has_siblings).to_string())),
                ("Siblings", a.siblings_names.clone()),
            ]);
        }
        Application::PlusOne(a) => {
            fields.extend([
                ("Application No", Some(a.application_number.clone())),
                ("Full Name", Some(a.full_name.clone())),
                ("Gender", Some(a.gender.clone())),
                ("Date of Birth", Some(a.date_of_birth.format("%d-%m-%Y").to_string())),
                ("Father's Name", Some(a.father_name.clone())),
                ("Mother's Name", Some(a.mother_name.clone())),
                ("House Name", Some(a.house_name.clone())),
                ("Landmark", a.landmark.clone()),
                ("Post Office", Some(a.post_office.clone())),
                ("Village", Some(a.village.clone())),
                ("Pincode", Some(a.pincode.clone())),
                ("District", Some(a.district.clone())),
                ("Email", a.email.clone()),
                ("Mobile Number", Some(a.mobile_number.clone())),
                ("10th School", Some(a.tenth_school.clone())),
                ("Board", Some(a.board.clone())),
                ("Exam Roll Number", Some(a.exam_roll_number.clone())),
                ("Exam Year", Some(a.exam_year.clone())),
                ("Stream", Some(a.stream.clone())),
                ("Siblings in School", Some(yes_no(a.has_siblings).to_string())),
                ("Siblings", a.siblings_names.clone()),
            ]);
        }
    }
    fields
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
}

pub fn documents_to_bring(form_type: FormType) -> Vec<&'static str> {
    let mut docs = vec![
        "Original Birth Certificate and one photocopy",
        "Transfer Certificate (if applicable)",
        "Previous academic records / mark sheets",
        "Recent passport-size photographs (2 nos.)",
        "This interview call letter",
    ];
    if form_type == FormType::PlusOne {
        docs.push("SSLC / 10th standard certificate and mark sheet");
    }
    docs
}

pub fn render_interview_letter(
    school: &SchoolProfile,
    application: &Application,
    interview_date: NaiveDate,
    issued_on: NaiveDate,
) -> String {
    let form_type = application.form_type();
    let time = application
        .interview_time()
        .unwrap_or("Will be communicated separately");
    let docs: String = documents_to_bring(form_type)
        .into_iter()
        .map(|d| format!("<li>{}</li>", esc(d)))
        .collect();

    let body = format!(
        r#"{letterhead}
<p style="text-align:right"><strong>Date:</strong> {issued}<br><strong>Ref:</strong> ADM/{year}/{number}</p>
<div class="title">INTERVIEW CALL LETTER</div>
<p><strong>Dear {name},</strong></p>
<p>We are pleased to inform you that your application for admission to <strong>{programme}</strong> has been shortlisted for the interview.</p>
<div class="box">
{applicant}
</div>
<div class="box">
{schedule}
</div>
<p><strong>Documents to bring:</strong></p>
<ul>{docs}</ul>
<p><strong>Instructions:</strong></p>
<ul>
<li>Please report 15 minutes before the scheduled time.</li>
<li>Students must be accompanied by a parent or guardian.</li>
<li>For any queries, contact the school office.</li>
</ul>
<p>We look forward to meeting you.</p>
<p>Regards,<br><br><strong>Principal</strong><br>{school_name}</p>"#,
        letterhead = letterhead(school),
        issued = issued_on.format("%d-%m-%Y"),
        year = issued_on.format("%Y"),
        number = esc(application.application_number()),
        name = esc(application.full_name()),
        programme = esc(form_type.label()),
        applicant = field_table(&[
            ("Application No", application.application_number().to_string()),
            ("Student Name", application.full_name().to_string()),
            ("Father's Name", application.father_name().to_string()),
            ("Mother's Name", application.mother_name().to_string()),
            ("Mobile Number", application.mobile_number().to_string()),
        ]),
        schedule = field_table(&[
            ("Interview Date", interview_date.format("%A, %-d %B %Y").to_string()),
            ("Interview Time", time.to_string()),
            ("Venue", school.name.clone()),
        ]),
        docs = docs,
        school_name = esc(&school.name),
    );
    page("Interview Call Letter", &body)
}

pub fn render_application_copy(school: &SchoolProfile, application: &Application) -> String {
    let status = application
        .status()
        .map(|s| s.label().to_string())
        .unwrap_or_default();
    let body = format!(
        r#"{letterhead}
<div class="title">APPLICATION FORM: {programme}</div>
<p><strong>Submitted:</strong> {submitted} &nbsp; <strong>Status:</strong> {status}</p>
{fields}"#,
        letterhead = letterhead(school),
        programme = esc(application.form_type().label()),
        submitted = application.created_at().format("%d-%m-%Y"),
        status = esc(&status),
        fields = field_table(&application_fields(application)),
    );
    page("Application Copy", &body)
}

async fn store_document(
    state: &AppState,
    application_number: &str,
    name: &str,
    html: String,
) -> Result<DocumentResponse, AppError> {
    let key = document_key(application_number, name);
    put_object(
        &state.s3,
        &state.config.s3_bucket,
        &key,
        html.clone().into_bytes(),
        HTML_CONTENT_TYPE,
    )
    .await?;
    info!("Generated {name} for application {application_number}");
    Ok(DocumentResponse {
        filename: format!("{application_number}-{name}"),
        key,
        html,
    })
}

/// POST /api/v1/admissions/interview-letter
pub async fn handle_interview_letter(
    State(state): State<AppState>,
    Json(req): Json<TrackRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let application = locate_application(&state.db, &req).await?;
    let status = status_of(&application)?;
    let interview_date = match (status, application.interview_date()) {
        (ApplicationStatus::ShortlistedForInterview, Some(date)) => date,
        (ApplicationStatus::ShortlistedForInterview, None) => {
            return Err(AppError::UnprocessableEntity(
                "Interview date has not been scheduled yet".to_string(),
            ))
        }
        _ => {
            return Err(AppError::UnprocessableEntity(
                "Application is not shortlisted for interview".to_string(),
            ))
        }
    };
    let html = render_interview_letter(
        &state.config.school,
        &application,
        interview_date,
        Utc::now().date_naive(),
    );
    let doc = store_document(
        &state,
        application.application_number(),
        "interview-letter.html",
        html,
    )
    .await?;
    Ok(Json(doc))
}

/// POST /api/v1/admissions/application-copy
pub async fn handle_application_copy(
    State(state): State<AppState>,
    Json(req): Json<TrackRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let application = locate_application(&state.db, &req).await?;
    let html = render_application_copy(&state.config.school, &application);
    let doc = store_document(
        &state,
        application.application_number(),
        "application-copy.html",
        html,
    )
    .await?;
    Ok(Json(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::admissions::PlusOneApplicationRow;
    use uuid::Uuid;

    fn school() -> SchoolProfile {
        SchoolProfile {
            name: "Model Higher Secondary School".into(),
            address: "Edappal, Malappuram".into(),
            contact: "office@example.edu".into(),
        }
    }

    fn application(name: &str) -> Application {
        Application::PlusOne(PlusOneApplicationRow {
            id: Uuid::new_v4(),
            application_number: "MHS2025-2048".into(),
            full_name: name.into(),
            gender: "male".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2009, 1, 20).unwrap(),
            father_name: "Abdul Kareem".into(),
            mother_name: "Sajitha".into(),
            house_name: "Panakkal".into(),
            landmark: None,
            post_office: "Edappal".into(),
            village: "Kalady".into(),
            pincode: "679576".into(),
            district: "Malappuram".into(),
            email: None,
            mobile_number: "9847012345".into(),
            tenth_school: "GHSS Edappal".into(),
            board: "SSLC".into(),
            exam_roll_number: "445566".into(),
            exam_year: "2024".into(),
            stream: "science".into(),
            has_siblings: false,
            siblings_names: None,
            status: "shortlisted_for_interview".into(),
            interview_date: NaiveDate::from_ymd_opt(2025, 4, 10),
            interview_time: Some("10:30 AM".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn test_interview_letter_escapes_applicant_text() {
        let app = application("<script>alert(1)</script>");
        let html = render_interview_letter(
            &school(),
            &app,
            NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(&esc("Thursday, 10 April 2025")));
        assert!(html.contains(&esc("10:30 AM")));
        assert!(html.contains(&esc("SSLC / 10th standard certificate")));
    }

    #[test]
    fn test_application_copy_skips_missing_fields() {
        let app = application("Muhammed Fayis");
        let fields = application_fields(&app);
        assert!(fields.iter().any(|(label, _)| *label == "Exam Roll Number"));
        assert!(!fields.iter().any(|(label, _)| *label == "Landmark"));

        let html = render_application_copy(&school(), &app);
        assert!(html.contains(&esc("Muhammed Fayis")));
        assert!(html.contains("Shortlisted"));
    }

    #[test]
    fn test_document_key() {
        assert_eq!(
            document_key("MHS2025-2048", "interview-letter.html"),
            "documents/MHS2025-2048/interview-letter.html"
        );
    }

    #[test]
    fn test_kg_documents_omit_sslc() {
        assert!(!documents_to_bring(FormType::KgStd)
            .iter()
            .any(|d| d.contains("SSLC")));
    }
}
