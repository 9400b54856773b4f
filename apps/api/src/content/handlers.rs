use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::content::resource::{self, ReorderRequest, ReorderResponse, Resource};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/admin/{resource}
pub async fn handle_list<R: Resource>(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<R::Row>>, AppError> {
    Ok(Json(resource::list_all::<R>(&state.db).await?))
}

/// GET /api/v1/admin/{resource}/:id
pub async fn handle_get<R: Resource>(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<R::Row>, AppError> {
    Ok(Json(resource::fetch::<R>(&state.db, id).await?))
}

/// POST /api/v1/admin/{resource}
pub async fn handle_create<R: Resource>(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(input): Json<R::Create>,
) -> Result<(StatusCode, Json<R::Row>), AppError> {
    let row = R::insert(&state.db, input).await?;
    state.cache.invalidate_public().await;
    info!("{} created {}", admin.email, R::LABEL);
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/v1/admin/{resource}/:id
pub async fn handle_update<R: Resource>(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<R::Patch>,
) -> Result<Json<R::Row>, AppError> {
    let row = R::update(&state.db, id, patch)
        .await?
        .ok_or_else(|| resource::not_found::<R>(id))?;
    state.cache.invalidate_public().await;
    info!("{} updated {} {id}", admin.email, R::LABEL);
    Ok(Json(row))
}

/// DELETE /api/v1/admin/{resource}/:id
pub async fn handle_delete<R: Resource>(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    resource::delete::<R>(&state.db, id).await?;
    state.cache.invalidate_public().await;
    info!("{} deleted {} {id}", admin.email, R::LABEL);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/{resource}/reorder
pub async fn handle_reorder<R: Resource>(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>, AppError> {
    let updated = resource::reorder::<R>(&state.db, &req.ids).await?;
    state.cache.invalidate_public().await;
    Ok(Json(ReorderResponse { updated }))
}

/// GET /api/v1/public/{resource}
pub async fn handle_public_list<R: Resource>(
    State(state): State<AppState>,
) -> Result<Json<Vec<R::Row>>, AppError> {
    Ok(Json(resource::list_public::<R>(&state.db).await?))
}
