use std::future::Future;

use rand::Rng;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::AppError;

pub const MAX_NUMBER_ATTEMPTS: usize = 8;
const SERIAL_RANGE: std::ops::RangeInclusive<u32> = 1000..=10999;

/// `<prefix><year>-<serial>`, e.g. `MHS2025-4821`.
pub fn format_application_number(prefix: &str, year: i32, serial: u32) -> String {
    format!("{prefix}{year}-{serial}")
}

pub fn random_application_number<R: Rng + ?Sized>(rng: &mut R, prefix: &str, year: i32) -> String {
    format_application_number(prefix, year, rng.gen_range(SERIAL_RANGE))
}

/// Whether either application table already holds `number`.
pub async fn number_taken(pool: &PgPool, number: &str) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM kg_std_applications WHERE application_number = $1)
            OR EXISTS (SELECT 1 FROM plus_one_applications WHERE application_number = $1)
        "#,
    )
    .bind(number)
    .fetch_one(pool)
    .await?)
}

/// Draws numbers until one is free and the insert succeeds.
///
/// `taken` screens a candidate against both application tables; the
/// per-table unique index catches concurrent submissions, which are retried
/// too. Any other insert error is returned as is.
pub async fn insert_with_fresh_number<N, T, TFut, I, IFut>(
    mut next_number: N,
    mut taken: T,
    mut insert: I,
) -> Result<(String, Uuid), AppError>
where
    N: FnMut() -> String,
    T: FnMut(String) -> TFut,
    TFut: Future<Output = Result<bool, AppError>>,
    I: FnMut(String) -> IFut,
    IFut: Future<Output = Result<Uuid, sqlx::Error>>,
{
    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let number = next_number();
        if taken(number.clone()).await? {
            warn!("Application number {number} taken (attempt {attempt})");
            continue;
        }
        match insert(number.clone()).await {
            Ok(id) => return Ok((number, id)),
            Err(e) if is_unique_violation(&e) => {
                warn!("Application number {number} collided on insert (attempt {attempt})");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique application number after {MAX_NUMBER_ATTEMPTS} attempts"
    )))
}
