use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_new_password};
use crate::auth::sessions::revoke_user_sessions;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::user::{AppRole, User, UserRow};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    Ok(
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password: &str,
    full_name: Option<&str>,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    if !email_address::EmailAddress::is_valid(&email) {
        return Err(AppError::Validation(format!("'{email}' is not a valid email")));
    }
    validate_new_password(password)?;
    let password_hash = hash_password(password).await?;

    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, password_hash, full_name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(full_name.map(str::trim).filter(|n| !n.is_empty()))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("A user with email {email} already exists"))
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Created user {} ({})", row.id, row.email);
    Ok(row.into())
}

/// Grants a role; granting a role the user already holds is a no-op.
pub async fn grant_role(pool: &PgPool, user_id: Uuid, role: AppRole) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id, role) DO NOTHING",
    )
    .bind(user_id)
    .bind(role.as_str())
    .execute(pool)
    .await?;
    info!("Granted role {} to user {user_id}", role.as_str());
    Ok(())
}

/// Sets a new password and signs the user out everywhere.
pub async fn reset_password(pool: &PgPool, email: &str, password: &str) -> Result<User, AppError> {
    validate_new_password(password)?;
    let user = find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user with email {}", email.trim())))?;

    let password_hash = hash_password(password).await?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(user.id)
        .execute(pool)
        .await?;
    let revoked = revoke_user_sessions(pool, user.id).await?;
    info!("Reset password for {} and revoked {revoked} sessions", user.email);
    Ok(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_trims_and_lowercases() {
        assert_eq!(
            normalize_email("  Web.ModernHSS@Gmail.com "),
            "web.modernhss@gmail.com"
        );
    }
}
