//! Typed query interface over cached projections.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::instrument;
use uuid::Uuid;

use crate::cache::ProjectionCache;
use crate::error::ReadModelError;
use crate::projection::{CachedProjection, projection_key};

/// Point lookups of one entity kind's projections.
///
/// No joins and no check against the write side: a read may return a
/// document that lags behind the latest committed event.
pub struct ReadModelFacade<T> {
    cache: Arc<dyn ProjectionCache>,
    entity_kind: &'static str,
    _view: PhantomData<fn() -> T>,
}

impl<T> Clone for ReadModelFacade<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            entity_kind: self.entity_kind,
            _view: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for ReadModelFacade<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadModelFacade")
            .field("entity_kind", &self.entity_kind)
            .finish_non_exhaustive()
    }
}

impl<T> ReadModelFacade<T>
where
    T: DeserializeOwned,
{
    /// Creates a facade reading `"<entity_kind>:<id>"` keys from `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn ProjectionCache>, entity_kind: &'static str) -> Self {
        Self {
            cache,
            entity_kind,
            _view: PhantomData,
        }
    }

    /// The entity kind this facade serves.
    #[must_use]
    pub fn entity_kind(&self) -> &'static str {
        self.entity_kind
    }

    /// Returns the cached projection for `id`.
    ///
    /// # Errors
    ///
    /// Returns `ReadModelError::ProjectionMiss` if nothing is cached for `id`,
    /// `ReadModelError::Cache` if the cache fails, and
    /// `ReadModelError::Decode` if the document does not match `T`.
    #[instrument(skip(self), fields(entity_kind = self.entity_kind))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<CachedProjection<T>, ReadModelError> {
        let key = projection_key(self.entity_kind, id);
        let Some(raw) = self.cache.get(&key).await? else {
            return Err(ReadModelError::ProjectionMiss { key });
        };
        serde_json::from_str(&raw).map_err(|e| ReadModelError::Decode(e.to_string()))
    }
}
