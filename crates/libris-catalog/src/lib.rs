//! Libris — Catalog bounded context.
//!
//! Owns the `Book` aggregate (creation, renaming, author changes) and the
//! book projection served to readers.

pub mod application;
pub mod domain;
