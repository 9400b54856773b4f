use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::accounts::find_user_by_email;
use crate::auth::extract::CurrentUser;
use crate::auth::password::{burn_verify, verify_password};
use crate::auth::sessions::{create_session, purge_expired, revoke_session};
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    // Unknown email and wrong password are indistinguishable to the caller,
    // in the response and in how long it takes.
    let user = match find_user_by_email(&state.db, &req.email).await? {
        Some(user) => {
            if verify_password(&req.password, &user.password_hash).await? {
                Some(user)
            } else {
                None
            }
        }
        None => {
            burn_verify(&req.password).await?;
            None
        }
    };
    let Some(user) = user else {
        warn!("Failed login for {}", req.email.trim());
        return Err(AppError::Unauthorized);
    };

    let (token, expires_at) =
        create_session(&state.db, user.id, state.config.session_ttl_hours).await?;
    let purged = purge_expired(&state.db).await?;
    if purged > 0 {
        info!("Purged {purged} expired sessions");
    }

    let roles: Vec<String> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
            .bind(user.id)
            .fetch_all(&state.db)
            .await?;

    info!("User {} signed in", user.email);
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: user.into(),
        roles,
    }))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, AppError> {
    revoke_session(&state.db, &user.token).await?;
    info!("User {} signed out", user.session.email);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(user: CurrentUser) -> Json<MeResponse> {
    let session = user.session;
    Json(MeResponse {
        user: User {
            id: session.user_id,
            email: session.email,
            full_name: session.full_name,
            created_at: session.created_at,
        },
        roles: session.roles,
        expires_at: session.expires_at,
    })
}
