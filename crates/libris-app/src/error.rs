//! Libris — startup error types.

use libris_core::bus::EventBusError;
use thiserror::Error;
use tokio::task::JoinError;

/// Startup and runtime errors for the projector process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the event-store schema failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// The Redis broker or cache could not be reached.
    #[error("redis error: {0}")]
    Redis(String),

    /// The projection worker could not subscribe.
    #[error("subscription error: {0}")]
    Subscription(#[from] EventBusError),

    /// The projection worker task panicked.
    #[error("worker error: {0}")]
    Worker(#[from] JoinError),

    /// The projection worker exited before shutdown was requested.
    #[error("projection worker stopped unexpectedly")]
    WorkerStopped,

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {0}")]
    Signal(#[from] std::io::Error),
}
