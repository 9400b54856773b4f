use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::admissions::repository::lock_status;
use crate::errors::AppError;
use crate::interview::marks::MarkEntry;
use crate::models::admissions::{
    ApplicationStatus, FormType, InterviewMarkRow, InterviewTemplateRow,
};

/// Subjects installed by `seed-templates` for a form type that has none.
pub fn default_subjects(form_type: FormType) -> &'static [(&'static str, i32)] {
    match form_type {
        FormType::KgStd => &[
            ("English", 25),
            ("Mathematics", 25),
            ("General Knowledge", 25),
            ("Drawing", 25),
        ],
        FormType::PlusOne => &[
            ("Physics", 25),
            ("Chemistry", 25),
            ("Mathematics", 25),
            ("English", 25),
        ],
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateSubjectInput {
    pub subject_name: String,
    pub max_marks: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTemplatesRequest {
    pub subjects: Vec<TemplateSubjectInput>,
}

/// Cleans a submitted subject list into `(name, max_marks)` in display order.
/// Blank rows are dropped; duplicate names (ignoring case) and max below 1 are 400.
pub fn plan_templates(subjects: Vec<TemplateSubjectInput>) -> Result<Vec<(String, i32)>, AppError> {
    let mut seen = HashSet::new();
    let mut planned = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let name = subject.subject_name.trim();
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(AppError::Validation(format!(
                "Subject '{name}' is listed more than once"
            )));
        }
        if subject.max_marks < 1 {
            return Err(AppError::Validation(format!(
                "max_marks for {name} must be at least 1"
            )));
        }
        planned.push((name.to_string(), subject.max_marks));
    }
    Ok(planned)
}

pub async fn list_templates(
    pool: &PgPool,
    form_type: FormType,
) -> Result<Vec<InterviewTemplateRow>, AppError> {
    Ok(sqlx::query_as::<_, InterviewTemplateRow>(
        r#"
        SELECT * FROM interview_subject_templates
        WHERE form_type = $1
        ORDER BY display_order ASC, subject_name ASC
        "#,
    )
    .bind(form_type.as_str())
    .fetch_all(pool)
    .await?)
}

/// Every form type's templates, keyed by form type (empty lists included).
pub async fn list_grouped(
    pool: &PgPool,
) -> Result<BTreeMap<FormType, Vec<InterviewTemplateRow>>, AppError> {
    let mut grouped = BTreeMap::new();
    for form_type in FormType::ALL {
        grouped.insert(form_type, list_templates(pool, form_type).await?);
    }
    Ok(grouped)
}

async fn insert_templates(
    tx: &mut Transaction<'_, Postgres>,
    form_type: FormType,
    subjects: &[(String, i32)],
) -> Result<(), AppError> {
    for (position, (name, max_marks)) in subjects.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO interview_subject_templates
                (form_type, subject_name, max_marks, display_order, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            "#,
        )
        .bind(form_type.as_str())
        .bind(name)
        .bind(max_marks)
        .bind(position as i32 + 1)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Swaps a form type's template list for `subjects` in one transaction.
pub async fn replace_templates(
    pool: &PgPool,
    form_type: FormType,
    subjects: Vec<TemplateSubjectInput>,
) -> Result<Vec<InterviewTemplateRow>, AppError> {
    let planned = plan_templates(subjects)?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM interview_subject_templates WHERE form_type = $1")
        .bind(form_type.as_str())
        .execute(&mut *tx)
        .await?;
    insert_templates(&mut tx, form_type, &planned).await?;
    tx.commit().await?;

    info!(
        "Interview templates for {form_type} replaced with {} subjects",
        planned.len()
    );
    list_templates(pool, form_type).await
}

/// Installs the default subject lists where a form type has no templates.
/// Returns the form types that were seeded.
pub async fn seed_default_templates(pool: &PgPool) -> Result<Vec<FormType>, AppError> {
    let mut seeded = Vec::new();
    for form_type in FormType::ALL {
        let mut tx = pool.begin().await?;
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interview_subject_templates WHERE form_type = $1",
        )
        .bind(form_type.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if existing > 0 {
            info!("{form_type} already has {existing} interview subjects, skipping");
            continue;
        }
        let defaults: Vec<(String, i32)> = default_subjects(form_type)
            .iter()
            .map(|(name, max)| (name.to_string(), *max))
            .collect();
        insert_templates(&mut tx, form_type, &defaults).await?;
        tx.commit().await?;
        info!("Seeded {} interview subjects for {form_type}", defaults.len());
        seeded.push(form_type);
    }
    Ok(seeded)
}

// ────────────────────────────────────────────────────────────────────────────
// Stored marks
// ────────────────────────────────────────────────────────────────────────────

pub async fn load_marks(
    pool: &PgPool,
    form_type: FormType,
    application_id: Uuid,
) -> Result<Vec<InterviewMarkRow>, AppError> {
    Ok(sqlx::query_as::<_, InterviewMarkRow>(
        r#"
        SELECT * FROM interview_marks
        WHERE form_type = $1 AND application_id = $2
        ORDER BY created_at ASC, subject_name ASC
        "#,
    )
    .bind(form_type.as_str())
    .bind(application_id)
    .fetch_all(pool)
    .await?)
}

/// Replaces an application's marks, snapshotting each subject's max.
///
/// The application row stays locked from the status check until commit. With `complete_interview`, a shortlisted application moves to
/// `interview_complete` in the same transaction. Returns the status the
/// application ends up in.
pub async fn store_marks(
    pool: &PgPool,
    form_type: FormType,
    application_id: Uuid,
    entries: &[MarkEntry],
    complete_interview: bool,
) -> Result<ApplicationStatus, AppError> {
    let mut tx = pool.begin().await?;
    let (current, _) = lock_status(&mut tx, form_type, application_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("{form_type} application {application_id} not found"))
        })?;
    let mut status: ApplicationStatus = current
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    if !status.accepts_marks() {
        return Err(AppError::UnprocessableEntity(format!(
            "Marks can only be entered once the application is shortlisted (currently {})",
            status.label()
        )));
    }

    sqlx::query("DELETE FROM interview_marks WHERE form_type = $1 AND application_id = $2")
        .bind(form_type.as_str())
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO interview_marks
                (application_id, form_type, subject_name, marks_obtained, max_marks)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(application_id)
        .bind(form_type.as_str())
        .bind(&entry.subject_name)
        .bind(entry.marks_obtained)
        .bind(entry.max_marks)
        .execute(&mut *tx)
        .await?;
    }

    if complete_interview && status == ApplicationStatus::ShortlistedForInterview {
        let sql = format!(
            "UPDATE {} SET status = 'interview_complete', updated_at = NOW() WHERE id = $1",
            form_type.table()
        );
        sqlx::query(&sql)
            .bind(application_id)
            .execute(&mut *tx)
            .await?;
        status = ApplicationStatus::InterviewComplete;
        info!("Application {application_id} marked interview_complete");
    }

    tx.commit().await?;
    info!(
        "Stored {} interview marks for {form_type} application {application_id}",
        entries.len()
    );
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(name: &str, max: i32) -> TemplateSubjectInput {
        TemplateSubjectInput {
            subject_name: name.to_string(),
            max_marks: max,
        }
    }

    #[test]
    fn test_plan_templates_trims_and_drops_blanks() {
        let planned =
            plan_templates(vec![subject(" English ", 25), subject("  ", 10), subject("Drawing", 10)])
                .unwrap();
        assert_eq!(
            planned,
            vec![("English".to_string(), 25), ("Drawing".to_string(), 10)]
        );
    }

    #[test]
    fn test_plan_templates_rejects_duplicates_and_zero_max() {
        assert!(plan_templates(vec![subject("English", 25), subject("english", 20)]).is_err());
        assert!(plan_templates(vec![subject("English", 0)]).is_err());
    }

    #[test]
    fn test_default_subjects() {
        let kg: Vec<&str> = default_subjects(FormType::KgStd).iter().map(|(n, _)| *n).collect();
        assert_eq!(kg, ["English", "Mathematics", "General Knowledge", "Drawing"]);
        assert!(default_subjects(FormType::PlusOne).iter().all(|(_, max)| *max == 25));
    }

    fn entry(subject: &str, marks: f64) -> MarkEntry {
        MarkEntry {
            subject_name: subject.to_string(),
            marks_obtained: marks,
            max_marks: 25,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_complete_interview_moves_shortlisted_applicant(pool: PgPool) {
        use crate::admissions::repository::{fetch_application, seed_kg_std, status_of};

        let id = seed_kg_std(
            &pool,
            "MHS2025-3001",
            "9847012345",
            ApplicationStatus::ShortlistedForInterview,
        )
        .await;

        let status = store_marks(&pool, FormType::KgStd, id, &[entry("English", 20.0)], false)
            .await
            .unwrap();
        assert_eq!(status, ApplicationStatus::ShortlistedForInterview);

        let marks = [entry("English", 22.0), entry("Drawing", 19.5)];
        let status = store_marks(&pool, FormType::KgStd, id, &marks, true)
            .await
            .unwrap();
        assert_eq!(status, ApplicationStatus::InterviewComplete);

        let application = fetch_application(&pool, FormType::KgStd, id).await.unwrap();
        assert_eq!(
            status_of(&application).unwrap(),
            ApplicationStatus::InterviewComplete
        );
        let stored = load_marks(&pool, FormType::KgStd, id).await.unwrap();
        assert_eq!(stored.len(), 2);

        // Already complete: saving again keeps the status.
        let status = store_marks(&pool, FormType::KgStd, id, &marks, true)
            .await
            .unwrap();
        assert_eq!(status, ApplicationStatus::InterviewComplete);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_marks_rejected_before_shortlisting(pool: PgPool) {
        use crate::admissions::repository::seed_kg_std;

        let id = seed_kg_std(&pool, "MHS2025-3002", "9847012345", ApplicationStatus::UnderReview)
            .await;
        let err = store_marks(&pool, FormType::KgStd, id, &[entry("English", 20.0)], true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        assert!(load_marks(&pool, FormType::KgStd, id).await.unwrap().is_empty());

        let err = store_marks(&pool, FormType::KgStd, Uuid::new_v4(), &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_replace_templates_is_all_or_nothing(pool: PgPool) {
        let rows = replace_templates(
            &pool,
            FormType::PlusOne,
            vec![subject("Physics", 25), subject("Chemistry", 25)],
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);

        let err = replace_templates(
            &pool,
            FormType::PlusOne,
            vec![subject("Biology", 25), subject("biology", 25)],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Postgres rejects NUL in text, failing after the delete has run.
        let err = replace_templates(
            &pool,
            FormType::PlusOne,
            vec![subject("Biology", 25), subject("Computer\0Science", 25)],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        let kept: Vec<_> = list_templates(&pool, FormType::PlusOne)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.subject_name)
            .collect();
        assert_eq!(kept, ["Physics", "Chemistry"]);

        let rows = replace_templates(
            &pool,
            FormType::PlusOne,
            vec![subject("Mathematics", 50), subject("English", 25), subject("Physics", 25)],
        )
        .await
        .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.subject_name.as_str()).collect();
        assert_eq!(names, ["Mathematics", "English", "Physics"]);
        assert!(list_templates(&pool, FormType::KgStd).await.unwrap().is_empty());
    }
}
