use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::content::resource::Resource;
use crate::errors::AppError;
use crate::models::content::AcademicProgramRow;
use crate::validation::{optional, patch_nullable, patch_required, required};

pub struct AcademicPrograms;

#[derive(Debug, Deserialize)]
pub struct AcademicProgramInput {
    pub program_title: String,
    pub short_description: String,
    pub detailed_description: String,
    pub duration: Option<String>,
    pub icon_image: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcademicProgramPatch {
    pub program_title: Option<String>,
    pub short_description: Option<String>,
    pub detailed_description: Option<String>,
    pub duration: Option<String>,
    pub icon_image: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Trims each subject and rejects blanks.
pub fn clean_subjects(subjects: Vec<String>) -> Result<Vec<String>, AppError> {
    subjects
        .iter()
        .map(|s| {
            let s = s.trim();
            if s.is_empty() {
                Err(AppError::Validation(
                    "subjects cannot contain blank entries".to_string(),
                ))
            } else {
                Ok(s.to_string())
            }
        })
        .collect()
}

#[async_trait]
impl Resource for AcademicPrograms {
    const TABLE: &'static str = "academic_programs";
    const LABEL: &'static str = "Academic program";
    const ORDER_BY: &'static str = "display_order ASC, program_title ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = AcademicProgramRow;
    type Create = AcademicProgramInput;
    type Patch = AcademicProgramPatch;

    async fn insert(
        pool: &PgPool,
        input: AcademicProgramInput,
    ) -> Result<AcademicProgramRow, AppError> {
        Ok(sqlx::query_as::<_, AcademicProgramRow>(
            r#"
            INSERT INTO academic_programs
                (program_title, short_description, detailed_description, duration,
                 icon_image, subjects, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6,
                    COALESCE($7, (SELECT COALESCE(MAX(display_order), 0) + 1
                                  FROM academic_programs)),
                    COALESCE($8, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("program_title", &input.program_title)?)
        .bind(required("short_description", &input.short_description)?)
        .bind(required("detailed_description", &input.detailed_description)?)
        .bind(optional(input.duration))
        .bind(optional(input.icon_image))
        .bind(clean_subjects(input.subjects)?)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: AcademicProgramPatch,
    ) -> Result<Option<AcademicProgramRow>, AppError> {
        let subjects = patch.subjects.map(clean_subjects).transpose()?;
        Ok(sqlx::query_as::<_, AcademicProgramRow>(
            r#"
            UPDATE academic_programs SET
                program_title = COALESCE($2, program_title),
                short_description = COALESCE($3, short_description),
                detailed_description = COALESCE($4, detailed_description),
                duration = CASE WHEN $5::text IS NULL THEN duration ELSE NULLIF($5, '') END,
                icon_image = CASE WHEN $6::text IS NULL THEN icon_image ELSE NULLIF($6, '') END,
                subjects = COALESCE($7, subjects),
                display_order = COALESCE($8, display_order),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("program_title", patch.program_title)?)
        .bind(patch_required("short_description", patch.short_description)?)
        .bind(patch_required("detailed_description", patch.detailed_description)?)
        .bind(patch_nullable(patch.duration))
        .bind(patch_nullable(patch.icon_image))
        .bind(subjects)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_subjects() {
        let cleaned = clean_subjects(vec![" Physics ".into(), "Chemistry".into()]).unwrap();
        assert_eq!(cleaned, vec!["Physics", "Chemistry"]);
        assert!(clean_subjects(vec!["Biology".into(), "  ".into()]).is_err());
        assert!(clean_subjects(Vec::new()).unwrap().is_empty());
    }
}
