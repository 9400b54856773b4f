use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::cache::PublicCache;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Redis-backed cache for the public home bundle.
    pub cache: PublicCache,
    /// Uploaded images and rendered admission documents.
    pub s3: S3Client,
    pub config: Config,
}
