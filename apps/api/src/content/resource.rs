use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// One back-office managed table.
///
/// Listing, fetching, deleting and reordering are shared SQL driven by the
/// associated constants; each resource supplies its own validated insert and
/// partial update.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Table name. Interpolated into SQL, so it must be a literal.
    const TABLE: &'static str;
    /// Human label used in messages and logs.
    const LABEL: &'static str;
    const ORDER_BY: &'static str;
    /// Visibility predicate for anonymous readers; `None` = admin-only.
    const PUBLIC_FILTER: Option<&'static str> = None;
    /// Whether the table carries a `display_order` the admin can rearrange.
    const ORDERED: bool = false;

    type Row: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static;
    type Create: DeserializeOwned + Send + 'static;
    type Patch: DeserializeOwned + Send + 'static;

    async fn insert(pool: &PgPool, input: Self::Create) -> Result<Self::Row, AppError>;

    /// Applies a partial update. `Ok(None)` when no row has that id.
    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: Self::Patch,
    ) -> Result<Option<Self::Row>, AppError>;
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub updated: usize,
}

pub async fn list_all<R: Resource>(pool: &PgPool) -> Result<Vec<R::Row>, AppError> {
    let sql = format!("SELECT * FROM {} ORDER BY {}", R::TABLE, R::ORDER_BY);
    Ok(sqlx::query_as::<_, R::Row>(&sql).fetch_all(pool).await?)
}

pub async fn list_public<R: Resource>(pool: &PgPool) -> Result<Vec<R::Row>, AppError> {
    let filter = R::PUBLIC_FILTER
        .ok_or_else(|| AppError::NotFound(format!("{} is not published", R::LABEL)))?;
    let sql = format!(
        "SELECT * FROM {} WHERE {} ORDER BY {}",
        R::TABLE,
        filter,
        R::ORDER_BY
    );
    Ok(sqlx::query_as::<_, R::Row>(&sql).fetch_all(pool).await?)
}

/// Like `list_public`, capped at `limit` rows.
pub async fn list_public_limited<R: Resource>(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<R::Row>, AppError> {
    let filter = R::PUBLIC_FILTER.unwrap_or("TRUE");
    let sql = format!(
        "SELECT * FROM {} WHERE {} ORDER BY {} LIMIT $1",
        R::TABLE,
        filter,
        R::ORDER_BY
    );
    Ok(sqlx::query_as::<_, R::Row>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn fetch<R: Resource>(pool: &PgPool, id: Uuid) -> Result<R::Row, AppError> {
    let sql = format!("SELECT * FROM {} WHERE id = $1", R::TABLE);
    sqlx::query_as::<_, R::Row>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found::<R>(id))
}

pub async fn delete<R: Resource>(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", R::TABLE);
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(not_found::<R>(id));
    }
    info!("Deleted {} {id}", R::LABEL);
    Ok(())
}

/// Rewrites `display_order` to 1..n following `ids`, all or nothing.
pub async fn reorder<R: Resource>(pool: &PgPool, ids: &[Uuid]) -> Result<usize, AppError> {
    if !R::ORDERED {
        return Err(AppError::Validation(format!(
            "{} cannot be reordered",
            R::LABEL
        )));
    }
    check_unique_ids(ids)?;

    let sql = format!(
        "UPDATE {} SET display_order = $1, updated_at = NOW() WHERE id = $2",
        R::TABLE
    );
    let mut tx = pool.begin().await?;
    for (position, id) in ids.iter().enumerate() {
        let result = sqlx::query(&sql)
            .bind(position as i32 + 1)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the positions already written.
            return Err(not_found::<R>(*id));
        }
    }
    tx.commit().await?;

    info!("Reordered {} {} rows", ids.len(), R::LABEL);
    Ok(ids.len())
}

pub fn check_unique_ids(ids: &[Uuid]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation("ids must not be empty".to_string()));
    }
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::Validation(format!("id {dup} appears more than once")));
    }
    Ok(())
}

pub fn not_found<R: Resource>(id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {id} not found", R::LABEL))
}

/// Turns a unique-constraint violation into a 409 with `message`.
pub fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if crate::db::is_unique_violation(&err) {
        AppError::Conflict(message())
    } else {
        AppError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_unique_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(check_unique_ids(&[a, b]).is_ok());
        assert!(check_unique_ids(&[a, b, a]).is_err());
        assert!(check_unique_ids(&[]).is_err());
    }
}
