//! Libris projector entry point.
//!
//! Subscribes to the committed-event channels and keeps the cached read
//! models in step with the event log until interrupted.

use std::error::Error;
use std::sync::Arc;

use libris_app::{AppConfig, Backends, compose, supervise};
use libris_core::clock::SystemClock;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Libris projector");

    let config = AppConfig::from_env()?;
    let backends = Backends::connect(&config).await?;
    let services = compose(backends, Arc::new(SystemClock));

    let worker = services.start_projector().await?;
    supervise(worker, tokio::signal::ctrl_c()).await?;
    tracing::info!("Projector stopped");
    Ok(())
}
