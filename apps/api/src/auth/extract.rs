use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::auth::sessions::resolve_session;
use crate::errors::AppError;
use crate::models::user::{AppRole, SessionUserRow};
use crate::state::AppState;

/// Any signed-in user. Rejects with 401 when the bearer token is missing,
/// malformed, unknown or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: String,
    pub session: SessionUserRow,
}

impl CurrentUser {
    pub fn has_role(&self, role: AppRole) -> bool {
        self.session.roles.iter().any(|r| r == role.as_str())
    }
}

/// A signed-in user holding the `admin` role. Guards every back-office route.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;
    let (scheme, token) = value.split_once(' ').ok_or(AppError::Unauthorized)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)?.to_string();
        let session = resolve_session(&state.db, &token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser { token, session })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.has_role(AppRole::Admin) {
            tracing::warn!("User {} denied admin access", user.session.email);
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser {
            user_id: user.session.user_id,
            email: user.session.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsed() {
        assert_eq!(bearer_token(&headers("Bearer abc123")).unwrap(), "abc123");
        assert_eq!(bearer_token(&headers("bearer  abc123 ")).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthorized() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer")),
            Err(AppError::Unauthorized)
        ));
    }
}
