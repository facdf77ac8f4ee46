//! Long-running subscription that feeds the dispatcher.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use libris_core::bus::{EventBus, EventBusError, MessageStream};

use crate::dispatcher::EventDispatcher;

/// Subscribes to every channel the registry covers and dispatches each
/// arriving message.
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Opens the subscription and spawns the dispatch loop.
    ///
    /// The subscription is live when this returns, so events published
    /// afterwards are seen by the worker.
    ///
    /// # Errors
    ///
    /// Returns `EventBusError` if the subscription cannot be opened.
    pub async fn start(
        bus: Arc<dyn EventBus>,
        dispatcher: EventDispatcher,
    ) -> Result<WorkerHandle, EventBusError> {
        let channels = dispatcher.registry().channels();
        let stream = bus.subscribe(&channels).await?;
        info!(?channels, "projection worker subscribed");

        let token = CancellationToken::new();
        let task = tokio::spawn(run(stream, dispatcher, token.clone()));
        Ok(WorkerHandle {
            token,
            task,
            exited: false,
        })
    }
}

async fn run(mut stream: MessageStream, dispatcher: EventDispatcher, token: CancellationToken) {
    loop {
        tokio::select! {
            () = token.cancelled() => {
                info!("projection worker stopping");
                break;
            }
            next = stream.next() => match next {
                Some(Ok(message)) => {
                    dispatcher.dispatch(&message).await;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "subscription error; continuing");
                }
                None => {
                    warn!("subscription closed");
                    break;
                }
            }
        }
    }
}

/// Handle to a running projection worker.
#[derive(Debug)]
pub struct WorkerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    exited: bool,
}

impl WorkerHandle {
    /// A token that stops the worker when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Returns `true` once the dispatch loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the worker after the message in flight (if any) and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the worker task panicked.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        self.token.cancel();
        self.stopped().await
    }

    /// Waits for the worker to exit on its own.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the worker task panicked.
    pub async fn join(mut self) -> Result<(), JoinError> {
        self.stopped().await
    }

    /// Waits for the dispatch loop to exit while keeping the handle, so the
    /// wait can be raced against a shutdown signal. Cancel safe.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the worker task panicked.
    pub async fn stopped(&mut self) -> Result<(), JoinError> {
        if self.exited {
            return Ok(());
        }
        let result = (&mut self.task).await;
        self.exited = true;
        result
    }
}
