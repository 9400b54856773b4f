use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::admissions::submission::{NewKgStdApplication, NewPlusOneApplication};
use crate::errors::AppError;
use crate::models::admissions::{
    Application, ApplicationStatus, ApplicationSummary, FormType, KgStdApplicationRow,
    PlusOneApplicationRow,
};
use crate::validation::phone_digits;

// ────────────────────────────────────────────────────────────────────────────
// Inserts
// ────────────────────────────────────────────────────────────────────────────

/// Returns the raw `sqlx::Error` so the caller can retry number collisions.
pub async fn insert_kg_std(
    pool: &PgPool,
    application_number: String,
    app: &NewKgStdApplication,
) -> Result<Uuid, sqlx::Error> {
    let a = &app.applicant;
    sqlx::query_scalar(
        r#"
        INSERT INTO kg_std_applications
            (application_number, full_name, gender, date_of_birth, stage, need_madrassa,
             previous_madrassa, father_name, mother_name, house_name, post_office, village,
             pincode, district, email, mobile_number, previous_school, has_siblings,
             siblings_names)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19)
        RETURNING id
        "#,
    )
    .bind(application_number)
    .bind(&a.full_name)
    .bind(&a.gender)
    .bind(a.date_of_birth)
    .bind(&app.stage)
    .bind(app.need_madrassa)
    .bind(&app.previous_madrassa)
    .bind(&a.father_name)
    .bind(&a.mother_name)
    .bind(&a.house_name)
    .bind(&a.post_office)
    .bind(&a.village)
    .bind(&a.pincode)
    .bind(&a.district)
    .bind(&a.email)
    .bind(&a.mobile_number)
    .bind(&app.previous_school)
    .bind(a.has_siblings)
    .bind(&a.siblings_names)
    .fetch_one(pool)
    .await
}

pub async fn insert_plus_one(
    pool: &PgPool,
    application_number: String,
    app: &NewPlusOneApplication,
) -> Result<Uuid, sqlx::Error> {
    let a = &app.applicant;
    sqlx::query_scalar(
        r#"
        INSERT INTO plus_one_applications
            (application_number, full_name, gender, date_of_birth, father_name, mother_name,
             house_name, landmark, post_office, village, pincode, district, email,
             mobile_number, tenth_school, board, exam_roll_number, exam_year, stream,
             has_siblings, siblings_names)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21)
        RETURNING id
        "#,
    )
    .bind(application_number)
    .bind(&a.full_name)
    .bind(&a.gender)
    .bind(a.date_of_birth)
    .bind(&a.father_name)
    .bind(&a.mother_name)
    .bind(&a.house_name)
    .bind(&app.landmark)
    .bind(&a.post_office)
    .bind(&a.village)
    .bind(&a.pincode)
    .bind(&a.district)
    .bind(&a.email)
    .bind(&a.mobile_number)
    .bind(&app.tenth_school)
    .bind(&app.board)
    .bind(&app.exam_roll_number)
    .bind(&app.exam_year)
    .bind(&app.stream)
    .bind(a.has_siblings)
    .bind(&a.siblings_names)
    .fetch_one(pool)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Lookups
// ────────────────────────────────────────────────────────────────────────────

pub async fn find_application(
    pool: &PgPool,
    form_type: FormType,
    id: Uuid,
) -> Result<Option<Application>, AppError> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", form_type.table());
    Ok(match form_type {
        FormType::KgStd => sqlx::query_as::<_, KgStdApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Application::KgStd),
        FormType::PlusOne => sqlx::query_as::<_, PlusOneApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Application::PlusOne),
    })
}

pub async fn fetch_application(
    pool: &PgPool,
    form_type: FormType,
    id: Uuid,
) -> Result<Application, AppError> {
    find_application(pool, form_type, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{form_type} application {id} not found")))
}

/// Public lookup: both the number and the (digits-only) mobile must match.
/// KG/STD is searched first, then +1.
pub async fn find_by_number_and_mobile(
    pool: &PgPool,
    application_number: &str,
    mobile_number: &str,
) -> Result<Option<Application>, AppError> {
    let kg = sqlx::query_as::<_, KgStdApplicationRow>(
        "SELECT * FROM kg_std_applications WHERE application_number = $1 AND mobile_number = $2",
    )
    .bind(application_number)
    .bind(mobile_number)
    .fetch_optional(pool)
    .await?;
    if let Some(row) = kg {
        return Ok(Some(Application::KgStd(row)));
    }

    let plus_one = sqlx::query_as::<_, PlusOneApplicationRow>(
        "SELECT * FROM plus_one_applications WHERE application_number = $1 AND mobile_number = $2",
    )
    .bind(application_number)
    .bind(mobile_number)
    .fetch_optional(pool)
    .await?;
    Ok(plus_one.map(Application::PlusOne))
}

/// Parsed status of a loaded application.
pub fn status_of(application: &Application) -> Result<ApplicationStatus, AppError> {
    application
        .status()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

// ────────────────────────────────────────────────────────────────────────────
// Admin listing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub form_type: Option<FormType>,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
}

/// Escapes LIKE wildcards and wraps the term for a substring match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Mobile numbers are stored as digits only, so the search term is reduced the
/// same way before matching them. `None` when the term is not a phone number.
pub fn mobile_pattern(term: &str) -> Option<String> {
    phone_digits("search", term, 1)
        .ok()
        .map(|digits| format!("%{digits}%"))
}

fn summary_select(form_type: FormType) -> String {
    format!(
        r#"
        SELECT id, '{}'::text AS form_type, application_number, full_name, mobile_number,
               status, interview_date, interview_time, created_at
        FROM {}
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL
               OR application_number ILIKE $2
               OR full_name ILIKE $2
               OR mobile_number LIKE $3)
        "#,
        form_type.as_str(),
        form_type.table()
    )
}

fn merged_select(filter: &ApplicationFilter) -> String {
    let form_types: Vec<FormType> = match filter.form_type {
        Some(form_type) => vec![form_type],
        None => FormType::ALL.to_vec(),
    };
    form_types
        .into_iter()
        .map(summary_select)
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
}

/// One page of both application tables merged, newest first, plus the total.
pub async fn list_applications(
    pool: &PgPool,
    filter: &ApplicationFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<ApplicationSummary>, i64), AppError> {
    let merged = merged_select(filter);
    let status = filter.status.map(|s| s.as_str());
    let term = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let search = term.map(like_pattern);
    let mobile = term.and_then(mobile_pattern);

    let page_sql = format!(
        "SELECT * FROM ({merged}) AS merged ORDER BY created_at DESC, application_number ASC LIMIT $4 OFFSET $5"
    );
    let rows = sqlx::query_as::<_, ApplicationSummary>(&page_sql)
        .bind(status)
        .bind(&search)
        .bind(&mobile)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM ({merged}) AS merged");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(status)
        .bind(&search)
        .bind(&mobile)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

#[derive(Debug, Serialize)]
pub struct ApplicationStats {
    pub total: i64,
    pub by_form_type: BTreeMap<FormType, i64>,
    pub by_status: BTreeMap<&'static str, i64>,
}

pub async fn application_stats(pool: &PgPool) -> Result<ApplicationStats, AppError> {
    let mut by_form_type = BTreeMap::new();
    let mut by_status: BTreeMap<&'static str, i64> = ApplicationStatus::PIPELINE
        .iter()
        .map(|s| (s.as_str(), 0))
        .collect();

    for form_type in FormType::ALL {
        let sql = format!(
            "SELECT status, COUNT(*) FROM {} GROUP BY status",
            form_type.table()
        );
        let counts: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(pool).await?;
        let mut form_total = 0;
        for (status, count) in counts {
            form_total += count;
            if let Ok(status) = status.parse::<ApplicationStatus>() {
                *by_status.entry(status.as_str()).or_default() += count;
            }
        }
        by_form_type.insert(form_type, form_total);
    }

    Ok(ApplicationStats {
        total: by_form_type.values().sum(),
        by_form_type,
        by_status,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Status + deletion
// ────────────────────────────────────────────────────────────────────────────

/// Interview date and time.
pub type Schedule = (Option<NaiveDate>, Option<String>);

/// Current status and schedule, row-locked until the transaction ends.
pub async fn lock_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    form_type: FormType,
    id: Uuid,
) -> Result<Option<(String, Schedule)>, AppError> {
    let sql = format!(
        "SELECT status, interview_date, interview_time FROM {} WHERE id = $1 FOR UPDATE",
        form_type.table()
    );
    let row: Option<(String, Option<NaiveDate>, Option<String>)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|(status, date, time)| (status, (date, time))))
}

pub async fn write_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    form_type: FormType,
    id: Uuid,
    status: ApplicationStatus,
    schedule: &Schedule,
) -> Result<(), AppError> {
    let sql = format!(
        r#"
        UPDATE {} SET status = $2, interview_date = $3, interview_time = $4, updated_at = NOW()
        WHERE id = $1
        "#,
        form_type.table()
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(status.as_str())
        .bind(schedule.0)
        .bind(&schedule.1)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Deletes applications and their interview marks in one transaction.
/// Returns how many applications existed and were removed.
pub async fn delete_applications(
    pool: &PgPool,
    items: &[(FormType, Uuid)],
) -> Result<u64, AppError> {
    let mut tx = pool.begin().await?;
    let mut deleted = 0;
    for (form_type, id) in items {
        sqlx::query("DELETE FROM interview_marks WHERE form_type = $1 AND application_id = $2")
            .bind(form_type.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let sql = format!("DELETE FROM {} WHERE id = $1", form_type.table());
        deleted += sqlx::query(&sql)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    info!("Deleted {deleted} of {} requested applications", items.len());
    Ok(deleted)
}

/// Inserts a KG/STD application with `status` for database tests.
#[cfg(test)]
pub async fn seed_kg_std(
    pool: &PgPool,
    application_number: &str,
    mobile_number: &str,
    status: ApplicationStatus,
) -> Uuid {
    use crate::admissions::submission::ApplicantDetails;

    let application = NewKgStdApplication {
        applicant: ApplicantDetails {
            full_name: "Aisha Rahman".into(),
            gender: "female".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2018, 6, 12).unwrap(),
            father_name: "Rahman K".into(),
            mother_name: "Safiya".into(),
            house_name: "Baithul Noor".into(),
            post_office: "Edappal".into(),
            village: "Vattamkulam".into(),
            pincode: "679576".into(),
            district: "Malappuram".into(),
            email: None,
            mobile_number: mobile_number.into(),
            has_siblings: false,
            siblings_names: None,
        },
        stage: "LKG".into(),
        need_madrassa: false,
        previous_madrassa: None,
        previous_school: None,
    };
    let id = insert_kg_std(pool, application_number.to_string(), &application)
        .await
        .unwrap();
    sqlx::query("UPDATE kg_std_applications SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await
        .unwrap();
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("MHS2025"), "%MHS2025%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_merged_select_respects_form_filter() {
        let only_kg = merged_select(&ApplicationFilter {
            form_type: Some(FormType::KgStd),
            ..Default::default()
        });
        assert!(only_kg.contains("kg_std_applications"));
        assert!(!only_kg.contains("plus_one_applications"));

        let both = merged_select(&ApplicationFilter::default());
        assert!(both.contains("UNION ALL"));
    }

    #[test]
    fn test_mobile_pattern_uses_stored_digits() {
        assert_eq!(mobile_pattern("+91 98470-12345").as_deref(), Some("%919847012345%"));
        assert_eq!(mobile_pattern("(0494) 2680").as_deref(), Some("%04942680%"));
        assert_eq!(mobile_pattern("MHS2025-1234"), None);
        assert_eq!(mobile_pattern("Aisha"), None);
        assert_eq!(mobile_pattern(" - "), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_search_matches_formatted_mobile(pool: PgPool) {
        seed_kg_std(&pool, "MHS2025-1001", "9847012345", ApplicationStatus::Submitted).await;
        seed_kg_std(&pool, "MHS2025-1002", "9995551234", ApplicationStatus::Submitted).await;

        let search = |term: &str| ApplicationFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let (rows, total) = list_applications(&pool, &search("98470 12345"), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].application_number, "MHS2025-1001");

        let (_, total) = list_applications(&pool, &search("MHS2025-100"), 20, 0)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_delete_applications_removes_marks(pool: PgPool) {
        let id = seed_kg_std(
            &pool,
            "MHS2025-2001",
            "9847012345",
            ApplicationStatus::ShortlistedForInterview,
        )
        .await;
        sqlx::query(
            r#"
            INSERT INTO interview_marks
                (application_id, form_type, subject_name, marks_obtained, max_marks)
            VALUES ($1, 'kg_std', 'English', 20, 25), ($1, 'kg_std', 'Drawing', 18, 25)
            "#,
        )
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

        let deleted = delete_applications(
            &pool,
            &[(FormType::KgStd, id), (FormType::PlusOne, Uuid::new_v4())],
        )
        .await
        .unwrap();
        assert_eq!(deleted, 1);

        let marks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM interview_marks WHERE application_id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(marks, 0);
        assert!(find_application(&pool, FormType::KgStd, id)
            .await
            .unwrap()
            .is_none());
    }
}
