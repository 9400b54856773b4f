use redis::AsyncCommands;
use redis::Client as RedisClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Key holding the serialized public home bundle.
pub const HOME_BUNDLE_KEY: &str = "schoolsite:public:home";

/// Read-through cache for public pages.
///
/// Redis is an accelerator only: every failure is logged and reported as a
/// miss, so a Redis outage never fails a request.
#[derive(Clone)]
pub struct PublicCache {
    client: RedisClient,
    ttl_secs: u64,
}

impl PublicCache {
    pub fn new(client: RedisClient, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis unavailable, skipping cache read: {e}");
                return None;
            }
        };
        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Redis GET {key} failed: {e}");
                return None;
            }
        };
        let value = serde_json::from_str(&raw?)
            .map_err(|e| warn!("Discarding undecodable cache entry {key}: {e}"))
            .ok()?;
        debug!("Cache hit: {key}");
        Some(value)
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        if self.ttl_secs == 0 {
            return;
        }
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize cache entry {key}: {e}");
                return;
            }
        };
        let result: redis::RedisResult<()> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.set_ex(key, payload, self.ttl_secs).await
        }
        .await;
        if let Err(e) = result {
            warn!("Redis SET {key} failed: {e}");
        }
    }

    /// Drops every cached public page. Called after each admin write.
    pub async fn invalidate_public(&self) {
        let result: redis::RedisResult<()> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.del(HOME_BUNDLE_KEY).await
        }
        .await;
        match result {
            Ok(()) => debug!("Public cache invalidated"),
            Err(e) => warn!("Redis DEL {HOME_BUNDLE_KEY} failed: {e}"),
        }
    }
}
