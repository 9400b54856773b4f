//! Field-level checks shared by the content managers and admission forms.
//! Every helper returns `AppError::Validation` naming the offending field.

use crate::errors::AppError;

/// Trimmed, non-blank text.
pub fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed text of at least `min` characters.
pub fn min_chars(field: &str, value: &str, min: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min {
        return Err(AppError::Validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text collapses to `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// PATCH value for a required column: absent keeps, blank is rejected.
pub fn patch_required(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    value.map(|v| required(field, &v)).transpose()
}

/// PATCH value for a nullable column: absent keeps, empty string clears.
pub fn patch_nullable(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<String, AppError> {
    let normalized = value.trim().to_ascii_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(AppError::Validation(format!(
            "{field} must be one of: {}",
            allowed.join(", ")
        )))
    }
}

pub fn http_url(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = required(field, value)?;
    let lower = trimmed.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(AppError::Validation(format!(
            "{field} must be an http(s) URL"
        )));
    }
    Ok(trimmed)
}

pub fn email(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if !email_address::EmailAddress::is_valid(trimmed) {
        return Err(AppError::Validation(format!("{field} is not a valid email")));
    }
    Ok(trimmed.to_string())
}

pub fn non_negative(field: &str, value: i32) -> Result<i32, AppError> {
    if value < 0 {
        return Err(AppError::Validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

/// Digits only, with spaces, `+`, `-` and parentheses stripped; at least `min` digits.
pub fn phone_digits(field: &str, value: &str, min: usize) -> Result<String, AppError> {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '+' | '-' | '(' | ')'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(format!(
            "{field} must contain digits only"
        )));
    }
    if digits.len() < min {
        return Err(AppError::Validation(format!(
            "{field} must be at least {min} digits"
        )));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required("title", "  Welcome ").unwrap(), "Welcome");
        assert!(required("title", "   ").is_err());
    }

    #[test]
    fn test_optional_collapses_blank() {
        assert_eq!(optional(Some("  ".into())), None);
        assert_eq!(optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_patch_helpers() {
        assert_eq!(patch_required("title", None).unwrap(), None);
        assert!(patch_required("title", Some(" ".into())).is_err());
        assert_eq!(patch_nullable(Some("".into())), Some(String::new()));
    }

    #[test]
    fn test_one_of_normalizes_case() {
        assert_eq!(
            one_of("platform", "YouTube", &["facebook", "youtube"]).unwrap(),
            "youtube"
        );
        assert!(one_of("platform", "myspace", &["facebook"]).is_err());
    }

    #[test]
    fn test_http_url() {
        assert!(http_url("url", "https://facebook.com/school").is_ok());
        assert!(http_url("url", "javascript:alert(1)").is_err());
    }

    #[test]
    fn test_phone_digits_strips_formatting() {
        assert_eq!(
            phone_digits("mobile_number", "+91 98470-12345", 10).unwrap(),
            "919847012345"
        );
        assert!(phone_digits("mobile_number", "98470", 10).is_err());
        assert!(phone_digits("mobile_number", "98470abcde", 10).is_err());
    }

    #[test]
    fn test_email() {
        assert!(email("email", "parent@example.com").is_ok());
        assert!(email("email", "not-an-email").is_err());
    }
}
