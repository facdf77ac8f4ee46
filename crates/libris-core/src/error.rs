//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict. The caller is expected to reload the
    /// aggregate, re-run the command and retry; nothing retries internally.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// The store did not confirm whether an append was committed. The stream
    /// must be reloaded before retrying.
    #[error("append outcome unknown for aggregate {0}; reload before retrying")]
    AppendOutcomeUnknown(Uuid),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for errors that are resolved by reloading the aggregate
    /// and re-running the command.
    #[must_use]
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::AppendOutcomeUnknown(_)
        )
    }
}
