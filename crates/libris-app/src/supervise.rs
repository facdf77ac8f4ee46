//! Keeps the projection worker running until the process is asked to stop.

use std::future::Future;

use libris_read_model::WorkerHandle;
use tracing::{error, info};

use crate::error::AppError;

/// Runs `worker` until `shutdown` resolves, then stops it.
///
/// A worker that exits on its own (its subscription closed) is an error: a
/// projector without a subscription keeps nothing up to date.
///
/// # Errors
///
/// Returns `AppError::WorkerStopped` if the worker exits first,
/// `AppError::Worker` if it panicked, and `AppError::Signal` if waiting for
/// `shutdown` fails.
pub async fn supervise<F>(mut worker: WorkerHandle, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = std::io::Result<()>>,
{
    let requested = tokio::select! {
        signal = shutdown => {
            signal?;
            true
        }
        exited = worker.stopped() => {
            exited?;
            false
        }
    };

    if !requested {
        error!("projection worker stopped unexpectedly");
        return Err(AppError::WorkerStopped);
    }

    info!("Shutdown signal received");
    worker.shutdown().await?;
    Ok(())
}
