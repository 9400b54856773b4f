use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Form type
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    KgStd,
    PlusOne,
}

impl FormType {
    pub const ALL: [FormType; 2] = [FormType::KgStd, FormType::PlusOne];

    pub fn as_str(self) -> &'static str {
        match self {
            FormType::KgStd => "kg_std",
            FormType::PlusOne => "plus_one",
        }
    }

    /// Table holding this form's applications. Interpolated into SQL.
    pub fn table(self) -> &'static str {
        match self {
            FormType::KgStd => "kg_std_applications",
            FormType::PlusOne => "plus_one_applications",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormType::KgStd => "KG & STD",
            FormType::PlusOne => "+1 / HSS",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "kg_std" => Ok(FormType::KgStd),
            "plus_one" => Ok(FormType::PlusOne),
            other => Err(format!("unknown form type '{other}'")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Application status
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    ShortlistedForInterview,
    InterviewComplete,
    Admitted,
    NotAdmitted,
}

impl ApplicationStatus {
    /// Pipeline order, as shown on the tracking page.
    pub const PIPELINE: [ApplicationStatus; 6] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::ShortlistedForInterview,
        ApplicationStatus::InterviewComplete,
        ApplicationStatus::Admitted,
        ApplicationStatus::NotAdmitted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::ShortlistedForInterview => "shortlisted_for_interview",
            ApplicationStatus::InterviewComplete => "interview_complete",
            ApplicationStatus::Admitted => "admitted",
            ApplicationStatus::NotAdmitted => "not_admitted",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Submitted",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::ShortlistedForInterview => "Shortlisted",
            ApplicationStatus::InterviewComplete => "Interview Complete",
            ApplicationStatus::Admitted => "Admitted",
            ApplicationStatus::NotAdmitted => "Not Admitted",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Application received",
            ApplicationStatus::UnderReview => "Being reviewed by admission committee",
            ApplicationStatus::ShortlistedForInterview => "Selected for interview",
            ApplicationStatus::InterviewComplete => "Interview conducted",
            ApplicationStatus::Admitted => "Congratulations! You're admitted",
            ApplicationStatus::NotAdmitted => "Application not successful",
        }
    }

    pub fn pipeline_index(self) -> usize {
        Self::PIPELINE
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Whether an admin may move an application from `self` to `next`.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Submitted, UnderReview | ShortlistedForInterview | NotAdmitted)
                | (UnderReview, ShortlistedForInterview | NotAdmitted)
                | (
                    ShortlistedForInterview,
                    ShortlistedForInterview | InterviewComplete | UnderReview
                )
                | (InterviewComplete, Admitted | NotAdmitted)
                | (Admitted, NotAdmitted)
                | (NotAdmitted, Admitted)
        )
    }

    /// Interview marks exist from shortlisting onwards.
    pub fn accepts_marks(self) -> bool {
        use ApplicationStatus::*;
        matches!(
            self,
            ShortlistedForInterview | InterviewComplete | Admitted | NotAdmitted
        )
    }

    /// Results are published to the applicant once the interview is done.
    pub fn shows_mark_list(self) -> bool {
        use ApplicationStatus::*;
        matches!(self, InterviewComplete | Admitted | NotAdmitted)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PIPELINE
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("unknown application status '{s}'"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KgStdApplicationRow {
    pub id: Uuid,
    pub application_number: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub stage: String,
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
    pub has_siblings: bool,
    pub siblings_names: Option<String>,
    pub status: String,
    pub interview_date: Option<NaiveDate>,
    pub interview_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlusOneApplicationRow {
    pub id: Uuid,
    pub application_number: String,
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
    pub has_siblings: bool,
    pub siblings_names: Option<String>,
    pub status: String,
    pub interview_date: Option<NaiveDate>,
    pub interview_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An application of either form type, tagged with `form_type` when serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "form_type", rename_all = "snake_case")]
pub enum Application {
    KgStd(KgStdApplicationRow),
    PlusOne(PlusOneApplicationRow),
}

impl Application {
    pub fn form_type(&self) -> FormType {
        match self {
            Application::KgStd(_) => FormType::KgStd,
            Application::PlusOne(_) => FormType::PlusOne,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Application::KgStd(a) => a.id,
            Application::PlusOne(a) => a.id,
        }
    }

    pub fn application_number(&self) -> &str {
        match self {
            Application::KgStd(a) => &a.application_number,
            Application::PlusOne(a) => &a.application_number,
        }
    }

    pub fn full_name(&self) -> &str {
        match self {
            Application::KgStd(a) => &a.full_name,
            Application::PlusOne(a) => &a.full_name,
        }
    }

    pub fn father_name(&self) -> &str {
        match self {
            Application::KgStd(a) => &a.father_name,
            Application::PlusOne(a) => &a.father_name,
        }
    }

    pub fn mother_name(&self) -> &str {
        match self {
            Application::KgStd(a) => &a.mother_name,
            Application::PlusOne(a) => &a.mother_name,
        }
    }

    pub fn mobile_number(&self) -> &str {
        match self {
            Application::KgStd(a) => &a.mobile_number,
            Application::PlusOne(a) => &a.mobile_number,
        }
    }

    /// Stored status; rows are constrained by a CHECK, so unknown text means
    /// the schema and code disagree.
    pub fn status(&self) -> Result<ApplicationStatus, String> {
        match self {
            Application::KgStd(a) => a.status.parse(),
            Application::PlusOne(a) => a.status.parse(),
        }
    }

    pub fn interview_date(&self) -> Option<NaiveDate> {
        match self {
            Application::KgStd(a) => a.interview_date,
            Application::PlusOne(a) => a.interview_date,
        }
    }

    pub fn interview_time(&self) -> Option<&str> {
        match self {
            Application::KgStd(a) => a.interview_time.as_deref(),
            Application::PlusOne(a) => a.interview_time.as_deref(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Application::KgStd(a) => a.created_at,
            Application::PlusOne(a) => a.created_at,
        }
    }
}

/// One line of the merged admin listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub form_type: String,
    pub application_number: String,
    pub full_name: String,
    pub mobile_number: String,
    pub status: String,
    pub interview_date: Option<NaiveDate>,
    pub interview_time: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdmissionFormRow {
    pub id: Uuid,
    pub form_type: String,
    pub is_active: bool,
    pub academic_year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewTemplateRow {
    pub id: Uuid,
    pub form_type: String,
    pub subject_name: String,
    pub max_marks: i32,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewMarkRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub form_type: String,
    pub subject_name: String,
    pub marks_obtained: f64,
    pub max_marks: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn test_transition_graph() {
        assert!(Submitted.can_transition_to(UnderReview));
        assert!(Submitted.can_transition_to(ShortlistedForInterview));
        assert!(Submitted.can_transition_to(NotAdmitted));
        assert!(!Submitted.can_transition_to(Admitted));
        assert!(!Submitted.can_transition_to(InterviewComplete));

        assert!(UnderReview.can_transition_to(ShortlistedForInterview));
        assert!(!UnderReview.can_transition_to(Submitted));

        assert!(ShortlistedForInterview.can_transition_to(ShortlistedForInterview));
        assert!(ShortlistedForInterview.can_transition_to(UnderReview));
        assert!(ShortlistedForInterview.can_transition_to(InterviewComplete));
        assert!(!ShortlistedForInterview.can_transition_to(Admitted));

        assert!(InterviewComplete.can_transition_to(Admitted));
        assert!(!InterviewComplete.can_transition_to(ShortlistedForInterview));

        assert!(Admitted.can_transition_to(NotAdmitted));
        assert!(NotAdmitted.can_transition_to(Admitted));
        assert!(!Admitted.can_transition_to(Admitted));
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in ApplicationStatus::PIPELINE {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
        assert!("approved".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_mark_visibility() {
        assert!(!ShortlistedForInterview.shows_mark_list());
        assert!(ShortlistedForInterview.accepts_marks());
        assert!(NotAdmitted.shows_mark_list());
        assert!(!UnderReview.accepts_marks());
    }

    #[test]
    fn test_form_type_serde_names() {
        assert_eq!(serde_json::to_string(&FormType::PlusOne).unwrap(), "\"plus_one\"");
        assert_eq!("kg_std".parse::<FormType>().unwrap(), FormType::KgStd);
        assert!("nursery".parse::<FormType>().is_err());
    }
}
