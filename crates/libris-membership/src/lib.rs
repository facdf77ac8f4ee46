//! Libris — Membership bounded context.
//!
//! Owns the `User` aggregate. A user's creation feeds two projections: the
//! user profile and the author record other contexts embed.

pub mod application;
pub mod domain;
