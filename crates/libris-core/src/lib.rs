//! Libris Core — shared event-sourcing abstractions.
//!
//! This crate defines the fundamental traits and types that the write side
//! (event store, repository) and the read side (event bus, projections)
//! depend on. It contains no infrastructure code.

pub mod aggregate;
pub mod bus;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod event_store;
pub mod locks;
pub mod repository;
