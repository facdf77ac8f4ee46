//! Redis-backed projection cache.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::cache::ProjectionCache;
use crate::error::CacheError;

fn cache_error(e: &redis::RedisError) -> CacheError {
    CacheError(e.to_string())
}

/// Projection cache stored as plain Redis string keys.
#[derive(Clone)]
pub struct RedisProjectionCache {
    conn: ConnectionManager,
}

impl RedisProjectionCache {
    /// Connects to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the URL is invalid or the server cannot be
    /// reached.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(|e| cache_error(&e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| cache_error(&e))?;
        Ok(Self { conn })
    }
}

impl std::fmt::Debug for RedisProjectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisProjectionCache").finish_non_exhaustive()
    }
}

#[async_trait]
impl ProjectionCache for RedisProjectionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| cache_error(&e))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| cache_error(&e))
    }
}
