//! Projection cache abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CacheError;

/// Key/value store holding serialized projection documents.
#[async_trait]
pub trait ProjectionCache: Send + Sync {
    /// Returns the document stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous document.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

#[async_trait]
impl<C> ProjectionCache for Arc<C>
where
    C: ProjectionCache + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        (**self).set(key, value).await
    }
}

/// Process-local projection cache for tests and dev.
#[derive(Debug, Default)]
pub struct InMemoryProjectionCache {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryProjectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached documents.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectionCache for InMemoryProjectionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}
