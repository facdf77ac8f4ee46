//! Read-side error types.

use thiserror::Error;

/// The projection cache could not be reached or rejected a command.
#[derive(Debug, Error)]
#[error("projection cache error: {0}")]
pub struct CacheError(pub String);

/// Failure of one handler on one event. Isolated by the dispatcher.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event payload or the cached document could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Reading or writing the projection cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A lookup into another read model failed.
    #[error("lookup failed: {0}")]
    Lookup(#[from] ReadModelError),
}

/// Errors surfaced by read-model queries.
#[derive(Debug, Error)]
pub enum ReadModelError {
    /// No projection is cached under `key`. This is "not built yet", not
    /// proof that the entity does not exist.
    #[error("no cached projection for {key}")]
    ProjectionMiss {
        /// The cache key that was looked up.
        key: String,
    },

    /// The projection cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The cached document did not match the expected view shape.
    #[error("cached projection could not be decoded: {0}")]
    Decode(String),
}

impl ReadModelError {
    /// Returns `true` if the lookup missed the cache.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::ProjectionMiss { .. })
    }
}
