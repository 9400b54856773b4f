use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::admissions::{InterviewMarkRow, InterviewTemplateRow};

/// One mark-entry line for an applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRow {
    pub subject_name: String,
    pub max_marks: i32,
    pub marks_obtained: Option<f64>,
    /// False for stored marks whose subject was later removed from the template.
    pub from_template: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkTotals {
    pub total_obtained: f64,
    pub total_max: i32,
    pub percentage: f64,
    pub entered: usize,
    pub subjects: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSheet {
    pub rows: Vec<MarkRow>,
    pub totals: MarkTotals,
}

/// A validated entry ready to store, carrying the template's canonical name.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkEntry {
    pub subject_name: String,
    pub marks_obtained: f64,
    pub max_marks: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubjectMarkInput {
    pub subject_name: String,
    pub marks_obtained: Option<f64>,
}

fn subject_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lays stored marks over the active templates.
///
/// Template rows come first in display order with the stored mark (if any)
/// matched by case-insensitive subject name. Stored marks with no template
/// follow, keeping the max they were recorded against.
pub fn build_mark_sheet(templates: &[InterviewTemplateRow], marks: &[InterviewMarkRow]) -> MarkSheet {
    let mut active: Vec<&InterviewTemplateRow> = templates.iter().filter(|t| t.is_active).collect();
    active.sort_by_key(|t| t.display_order);

    let mut matched = HashSet::new();
    let mut rows: Vec<MarkRow> = active
        .iter()
        .map(|template| {
            let key = subject_key(&template.subject_name);
            let stored = marks.iter().find(|m| subject_key(&m.subject_name) == key);
            if stored.is_some() {
                matched.insert(key);
            }
            MarkRow {
                subject_name: template.subject_name.clone(),
                max_marks: template.max_marks,
                marks_obtained: stored.map(|m| m.marks_obtained),
                from_template: true,
            }
        })
        .collect();

    rows.extend(
        marks
            .iter()
            .filter(|m| !matched.contains(&subject_key(&m.subject_name)))
            .map(|m| MarkRow {
                subject_name: m.subject_name.clone(),
                max_marks: m.max_marks,
                marks_obtained: Some(m.marks_obtained),
                from_template: false,
            }),
    );

    let totals = compute_totals(&rows);
    MarkSheet { rows, totals }
}

pub fn compute_totals(rows: &[MarkRow]) -> MarkTotals {
    let total_obtained: f64 = rows.iter().filter_map(|r| r.marks_obtained).sum();
    let total_max: i32 = rows.iter().map(|r| r.max_marks).sum();
    let entered = rows.iter().filter(|r| r.marks_obtained.is_some()).count();
    let percentage = if total_max > 0 {
        round2(total_obtained / f64::from(total_max) * 100.0)
    } else {
        0.0
    };
    MarkTotals {
        total_obtained: round2(total_obtained),
        total_max,
        percentage,
        entered,
        subjects: rows.len(),
        complete: entered == rows.len(),
    }
}

/// Checks submitted marks against the form type's templates.
///
/// Entries with no `marks_obtained` are dropped. Unknown subjects are 422,
/// duplicates and out-of-range values are 400.
pub fn validate_entries(
    templates: &[InterviewTemplateRow],
    inputs: Vec<SubjectMarkInput>,
) -> Result<Vec<MarkEntry>, AppError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(inputs.len());

    for input in inputs {
        let key = subject_key(&input.subject_name);
        if key.is_empty() {
            return Err(AppError::Validation("subject_name is required".to_string()));
        }
        if !seen.insert(key.clone()) {
            return Err(AppError::Validation(format!(
                "Subject '{}' appears more than once",
                input.subject_name.trim()
            )));
        }
        let template = templates
            .iter()
            .filter(|t| t.is_active)
            .find(|t| subject_key(&t.subject_name) == key)
            .ok_or_else(|| {
                AppError::UnprocessableEntity(format!(
                    "Subject '{}' is not configured for this form type",
                    input.subject_name.trim()
                ))
            })?;

        let Some(marks) = input.marks_obtained else {
            continue;
        };
        if !marks.is_finite() || marks < 0.0 || marks > f64::from(template.max_marks) {
            return Err(AppError::Validation(format!(
                "Marks for {} must be between 0 and {}",
                template.subject_name, template.max_marks
            )));
        }
        entries.push(MarkEntry {
            subject_name: template.subject_name.clone(),
            marks_obtained: marks,
            max_marks: template.max_marks,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn template(name: &str, max: i32, order: i32) -> InterviewTemplateRow {
        InterviewTemplateRow {
            id: Uuid::new_v4(),
            form_type: "kg_std".to_string(),
            subject_name: name.to_string(),
            max_marks: max,
            display_order: order,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn mark(name: &str, obtained: f64, max: i32) -> InterviewMarkRow {
        InterviewMarkRow {
            id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            form_type: "kg_std".to_string(),
            subject_name: name.to_string(),
            marks_obtained: obtained,
            max_marks: max,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn input(name: &str, marks: Option<f64>) -> SubjectMarkInput {
        SubjectMarkInput {
            subject_name: name.to_string(),
            marks_obtained: marks,
        }
    }

    #[test]
    fn test_mark_sheet_follows_template_order() {
        let templates = vec![template("Mathematics", 25, 2), template("English", 25, 1)];
        let marks = vec![mark("english", 20.0, 25)];
        let sheet = build_mark_sheet(&templates, &marks);

        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].subject_name, "English");
        assert_eq!(sheet.rows[0].marks_obtained, Some(20.0));
        assert_eq!(sheet.rows[1].marks_obtained, None);
        assert_eq!(sheet.totals.total_obtained, 20.0);
        assert_eq!(sheet.totals.total_max, 50);
        assert_eq!(sheet.totals.percentage, 40.0);
        assert_eq!(sheet.totals.entered, 1);
        assert!(!sheet.totals.complete);
    }

    #[test]
    fn test_orphan_marks_are_appended() {
        let templates = vec![template("English", 25, 1)];
        let marks = vec![mark("English", 25.0, 25), mark("Drawing", 7.5, 10)];
        let sheet = build_mark_sheet(&templates, &marks);

        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].subject_name, "Drawing");
        assert!(!sheet.rows[1].from_template);
        assert_eq!(sheet.totals.total_max, 35);
        assert_eq!(sheet.totals.total_obtained, 32.5);
        assert_eq!(sheet.totals.percentage, 92.86);
        assert!(sheet.totals.complete);
    }

    #[test]
    fn test_inactive_templates_are_skipped() {
        let mut retired = template("General Knowledge", 25, 3);
        retired.is_active = false;
        let sheet = build_mark_sheet(&[template("English", 25, 1), retired], &[]);
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_empty_sheet_has_zero_percentage() {
        let sheet = build_mark_sheet(&[], &[]);
        assert_eq!(sheet.totals.percentage, 0.0);
        assert_eq!(sheet.totals.subjects, 0);
        assert!(sheet.totals.complete);
    }

    #[test]
    fn test_validate_entries_uses_template_names() {
        let templates = vec![template("English", 25, 1), template("Mathematics", 25, 2)];
        let entries = validate_entries(
            &templates,
            vec![input(" english ", Some(18.0)), input("Mathematics", None)],
        )
        .unwrap();
        assert_eq!(
            entries,
            vec![MarkEntry {
                subject_name: "English".to_string(),
                marks_obtained: 18.0,
                max_marks: 25,
            }]
        );
    }

    #[test]
    fn test_validate_entries_rejections() {
        let templates = vec![template("English", 25, 1)];

        let unknown = validate_entries(&templates, vec![input("Physics", Some(1.0))]).unwrap_err();
        assert!(matches!(unknown, AppError::UnprocessableEntity(_)));

        let duplicate = validate_entries(
            &templates,
            vec![input("English", Some(1.0)), input("ENGLISH", Some(2.0))],
        )
        .unwrap_err();
        assert!(matches!(duplicate, AppError::Validation(_)));

        let too_high = validate_entries(&templates, vec![input("English", Some(26.0))]).unwrap_err();
        assert!(matches!(too_high, AppError::Validation(_)));

        let negative = validate_entries(&templates, vec![input("English", Some(-1.0))]).unwrap_err();
        assert!(matches!(negative, AppError::Validation(_)));
    }
}
