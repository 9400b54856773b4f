use axum::{extract::State, http::StatusCode, Json};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::admissions::forms::ensure_form_open;
use crate::admissions::numbering::{
    insert_with_fresh_number, number_taken, random_application_number,
};
use crate::admissions::repository::{insert_kg_std, insert_plus_one};
use crate::errors::AppError;
use crate::models::admissions::FormType;
use crate::state::AppState;
use crate::validation::{email, min_chars, one_of, optional, phone_digits};

pub const GENDERS: &[&str] = &["male", "female", "other"];
pub const STREAMS: &[&str] = &["science", "commerce", "humanities"];
pub const STAGES: &[&str] = &[
    "LKG", "UKG", "STD 1", "STD 2", "STD 3", "STD 4", "STD 5", "STD 6", "STD 7", "STD 8", "STD 9",
    "STD 10",
];

// ────────────────────────────────────────────────────────────────────────────
// Payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KgStdSubmission {
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub stage: String,
    #[serde(default)]
    pub need_madrassa: bool,
    pub previous_madrassa: Option<String>,
    pub father_name: String,
    pub mother_name: String,
    pub house_name: String,
    pub post_office: String,
    pub village: String,
    pub pincode: String,
    pub district: String,
    pub email: Option<String>,
    pub mobile_number: String,
    pub previous_school: Option<String>,
    #[serde(default)]
    pub has_siblings: bool,
    pub siblings_names: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlusOneSubmission {
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub house_name: String,
    pub landmark: Option<String>,
    pub post_office: String,
    pub village: String,
    pub pincode: String,
    pub district: String,
    pub email: Option<String>,
    pub mobile_number: String,
    pub tenth_school: String,
    pub board: String,
    pub exam_roll_number: String,
    pub exam_year: String,
    pub stream: String,
    #[serde(default)]
    pub has_siblings: bool,
    pub siblings_names: Option<String>,
}

/// Fields shared by both forms after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantDetails {
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub house_name: String,
    pub post_office: String,
    pub village: String,
    pub pincode: String,
    pub district: String,
    pub email: Option<String>,
    pub mobile_number: String,
    pub has_siblings: bool,
    pub siblings_names: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewKgStdApplication {
    pub applicant: ApplicantDetails,
    pub stage: String,
    pub need_madrassa: bool,
    pub previous_madrassa: Option<String>,
    pub previous_school: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlusOneApplication {
    pub applicant: ApplicantDetails,
    pub landmark: Option<String>,
    pub tenth_school: String,
    pub board: String,
    pub exam_roll_number: String,
    pub exam_year: String,
    pub stream: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionReceipt {
    pub application_number: String,
    pub form_type: FormType,
    pub id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation and normalisation
// ────────────────────────────────────────────────────────────────────────────

/// Standard number for `STD n` stages; `None` for LKG/UKG.
pub fn standard_of(stage: &str) -> Option<u8> {
    stage.strip_prefix("STD ").and_then(|n| n.parse().ok())
}

/// Upper-cases and collapses whitespace so `std  3` matches `STD 3`.
pub fn normalize_stage(stage: &str) -> Result<String, AppError> {
    let normalized = stage
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    if STAGES.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(AppError::Validation(format!(
            "stage must be one of: {}",
            STAGES.join(", ")
        )))
    }
}

fn pincode(value: &str) -> Result<String, AppError> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() < 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "pincode must be at least 6 digits".to_string(),
        ));
    }
    Ok(digits)
}

fn exam_year(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "exam_year must be a four-digit year".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[allow(clippy::too_many_arguments)]
fn applicant_details(
    today: NaiveDate,
    full_name: &str,
    gender: &str,
    date_of_birth: NaiveDate,
    father_name: &str,
    mother_name: &str,
    house_name: &str,
    post_office: &str,
    village: &str,
    pin: &str,
    district: &str,
    email_value: Option<String>,
    mobile_number: &str,
    has_siblings: bool,
    siblings_names: Option<String>,
) -> Result<ApplicantDetails, AppError> {
    if date_of_birth > today {
        return Err(AppError::Validation(
            "date_of_birth cannot be in the future".to_string(),
        ));
    }
    let email_value = optional(email_value)
        .map(|e| email("email", &e))
        .transpose()?;
    Ok(ApplicantDetails {
        full_name: min_chars("full_name", full_name, 2)?,
        gender: one_of("gender", gender, GENDERS)?,
        date_of_birth,
        father_name: min_chars("father_name", father_name, 2)?,
        mother_name: min_chars("mother_name", mother_name, 2)?,
        house_name: min_chars("house_name", house_name, 2)?,
        post_office: min_chars("post_office", post_office, 2)?,
        village: min_chars("village", village, 2)?,
        pincode: pincode(pin)?,
        district: min_chars("district", district, 2)?,
        email: email_value,
        mobile_number: phone_digits("mobile_number", mobile_number, 10)?,
        has_siblings,
        siblings_names: if has_siblings {
            optional(siblings_names)
        } else {
            None
        },
    })
}

impl KgStdSubmission {
    pub fn validate(self, today: NaiveDate) -> Result<NewKgStdApplication, AppError> {
        let stage = normalize_stage(&self.stage)?;
        let applicant = applicant_details(
            today,
            &self.full_name,
            &self.gender,
            self.date_of_birth,
            &self.father_name,
            &self.mother_name,
            &self.house_name,
            &self.post_office,
            &self.village,
            &self.pincode,
            &self.district,
            self.email,
            &self.mobile_number,
            self.has_siblings,
            self.siblings_names,
        )?;

        let standard = standard_of(&stage);
        let madrassa_offered = matches!(standard, Some(1..=7));
        let need_madrassa = self.need_madrassa && madrassa_offered;
        let previous_madrassa = if need_madrassa && matches!(standard, Some(2..=7)) {
            optional(self.previous_madrassa)
        } else {
            None
        };
        let previous_school = if standard.is_some() {
            optional(self.previous_school)
        } else {
            None
        };

        Ok(NewKgStdApplication {
            applicant,
            stage,
            need_madrassa,
            previous_madrassa,
            previous_school,
        })
    }
}

impl PlusOneSubmission {
    pub fn validate(self, today: NaiveDate) -> Result<NewPlusOneApplication, AppError> {
        let applicant = applicant_details(
            today,
            &self.full_name,
            &self.gender,
            self.date_of_birth,
            &self.father_name,
            &self.mother_name,
            &self.house_name,
            &self.post_office,
            &self.village,
            &self.pincode,
            &self.district,
            self.email,
            &self.mobile_number,
            self.has_siblings,
            self.siblings_names,
        )?;
        Ok(NewPlusOneApplication {
            applicant,
            landmark: optional(self.landmark),
            tenth_school: min_chars("tenth_school", &self.tenth_school, 2)?,
            board: min_chars("board", &self.board, 2)?,
            exam_roll_number: min_chars("exam_roll_number", &self.exam_roll_number, 1)?,
            exam_year: exam_year(&self.exam_year)?,
            stream: one_of("stream", &self.stream, STREAMS)?,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Numbering + insert
// ────────────────────────────────────────────────────────────────────────────

/// Inserts under a freshly drawn `PREFIX<year>-<serial>` number.
async fn insert_with_number<F, Fut>(
    state: &AppState,
    form_type: FormType,
    insert: F,
) -> Result<SubmissionReceipt, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = Result<Uuid, sqlx::Error>>,
{
    let prefix = &state.config.application_number_prefix;
    let year = Utc::now().year();
    let db = &state.db;
    let (application_number, id) = insert_with_fresh_number(
        || random_application_number(&mut rand::thread_rng(), prefix, year),
        |number| async move { number_taken(db, &number).await },
        insert,
    )
    .await?;
    info!("Received {form_type} application {application_number} ({id})");
    Ok(SubmissionReceipt {
        application_number,
        form_type,
        id,
    })
}

/// POST /api/v1/admissions/kg-std
pub async fn handle_submit_kg_std(
    State(state): State<AppState>,
    Json(submission): Json<KgStdSubmission>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), AppError> {
    let application = submission.validate(Utc::now().date_naive())?;
    ensure_form_open(&state.db, FormType::KgStd).await?;
    let receipt = insert_with_number(&state, FormType::KgStd, |number| {
        insert_kg_std(&state.db, number, &application)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /api/v1/admissions/plus-one
pub async fn handle_submit_plus_one(
    State(state): State<AppState>,
    Json(submission): Json<PlusOneSubmission>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), AppError> {
    let application = submission.validate(Utc::now().date_naive())?;
    ensure_form_open(&state.db, FormType::PlusOne).await?;
    let receipt = insert_with_number(&state, FormType::PlusOne, |number| {
        insert_plus_one(&state.db, number, &application)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn kg(stage: &str) -> KgStdSubmission {
        KgStdSubmission {
            full_name: "Aisha Rahman".into(),
            gender: "Female".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2018, 6, 12).unwrap(),
            stage: stage.into(),
            need_madrassa: true,
            previous_madrassa: Some("Darul Huda".into()),
            father_name: "Rahman K".into(),
            mother_name: "Safiya".into(),
            house_name: "Baithul Noor".into(),
            post_office: "Edappal".into(),
            village: "Vattamkulam".into(),
            pincode: "679576".into(),
            district: "Malappuram".into(),
            email: Some("".into()),
            mobile_number: "+91 98470 12345".into(),
            previous_school: Some("GLPS Edappal".into()),
            has_siblings: false,
            siblings_names: Some("Ameen (STD 4)".into()),
        }
    }

    fn plus_one() -> PlusOneSubmission {
        PlusOneSubmission {
            full_name: "Muhammed Fayis".into(),
            gender: "male".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2009, 1, 20).unwrap(),
            father_name: "Abdul Kareem".into(),
            mother_name: "Sajitha".into(),
            house_name: "Panakkal".into(),
            landmark: Some("  ".into()),
            post_office: "Edappal".into(),
            village: "Kalady".into(),
            pincode: "679 576".into(),
            district: "Malappuram".into(),
            email: Some("fayis@example.com".into()),
            mobile_number: "9847012345".into(),
            tenth_school: "GHSS Edappal".into(),
            board: "SSLC".into(),
            exam_roll_number: "445566".into(),
            exam_year: "2024".into(),
            stream: "Science".into(),
            has_siblings: true,
            siblings_names: Some("Fathima".into()),
        }
    }

    #[test]
    fn test_madrassa_kept_for_std_two_to_seven() {
        let app = kg("std 3").validate(today()).unwrap();
        assert_eq!(app.stage, "STD 3");
        assert!(app.need_madrassa);
        assert_eq!(app.previous_madrassa.as_deref(), Some("Darul Huda"));
        assert_eq!(app.previous_school.as_deref(), Some("GLPS Edappal"));
        assert_eq!(app.applicant.gender, "female");
        assert_eq!(app.applicant.mobile_number, "919847012345");
        assert_eq!(app.applicant.email, None);
        assert_eq!(app.applicant.siblings_names, None);
    }

    #[test]
    fn test_std_one_drops_previous_madrassa() {
        let app = kg("STD 1").validate(today()).unwrap();
        assert!(app.need_madrassa);
        assert_eq!(app.previous_madrassa, None);
        assert!(app.previous_school.is_some());
    }

    #[test]
    fn test_kindergarten_drops_madrassa_and_school() {
        let app = kg("LKG").validate(today()).unwrap();
        assert!(!app.need_madrassa);
        assert_eq!(app.previous_madrassa, None);
        assert_eq!(app.previous_school, None);
    }

    #[test]
    fn test_upper_standards_have_no_madrassa() {
        let app = kg("STD 9").validate(today()).unwrap();
        assert!(!app.need_madrassa);
        assert!(app.previous_school.is_some());
    }

    #[test]
    fn test_kg_rejections() {
        assert!(kg("STD 11").validate(today()).is_err());

        let mut future = kg("UKG");
        future.date_of_birth = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(future.validate(today()).is_err());

        let mut short_pin = kg("UKG");
        short_pin.pincode = "6795".into();
        assert!(short_pin.validate(today()).is_err());

        let mut short_mobile = kg("UKG");
        short_mobile.mobile_number = "98470".into();
        assert!(short_mobile.validate(today()).is_err());

        let mut bad_email = kg("UKG");
        bad_email.email = Some("parent@".into());
        assert!(bad_email.validate(today()).is_err());

        let mut short_name = kg("UKG");
        short_name.full_name = "A".into();
        assert!(short_name.validate(today()).is_err());
    }

    #[test]
    fn test_plus_one_normalisation() {
        let app = plus_one().validate(today()).unwrap();
        assert_eq!(app.stream, "science");
        assert_eq!(app.landmark, None);
        assert_eq!(app.applicant.pincode, "679576");
        assert_eq!(app.applicant.siblings_names.as_deref(), Some("Fathima"));
    }

    #[test]
    fn test_plus_one_exam_year_must_be_four_digits() {
        let mut app = plus_one();
        app.exam_year = "24".into();
        assert!(app.validate(today()).is_err());

        let mut stream = plus_one();
        stream.stream = "arts".into();
        assert!(stream.validate(today()).is_err());
    }

    #[test]
    fn test_standard_of() {
        assert_eq!(standard_of("STD 10"), Some(10));
        assert_eq!(standard_of("UKG"), None);
    }
}
