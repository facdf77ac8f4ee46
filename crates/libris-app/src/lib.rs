//! Libris — composition root.
//!
//! Wires the event stores, bus, projection cache, repositories and handlers
//! together in one explicit function ([`compose::compose`]). The
//! `libris-projector` binary uses it to run the projection worker.

pub mod compose;
pub mod config;
pub mod error;
pub mod supervise;

pub use compose::{Backends, Services, compose};
pub use config::AppConfig;
pub use error::AppError;
pub use supervise::supervise;
