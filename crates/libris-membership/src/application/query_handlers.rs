//! Query handlers for the Membership context.

use libris_read_model::{CachedProjection, ReadModelError, ReadModelFacade};
use uuid::Uuid;

use crate::application::event_handlers::{AuthorView, UserView};

/// Retrieves the cached user projection.
///
/// # Errors
///
/// Returns `ReadModelError::ProjectionMiss` if the user has not been
/// projected (yet), or any cache error.
pub async fn get_user_by_id(
    user_id: Uuid,
    users: &ReadModelFacade<UserView>,
) -> Result<CachedProjection<UserView>, ReadModelError> {
    users.get_by_id(user_id).await
}

/// Retrieves the cached author projection.
///
/// # Errors
///
/// Returns `ReadModelError::ProjectionMiss` if the author has not been
/// projected (yet), or any cache error.
pub async fn get_author_by_id(
    author_id: Uuid,
    authors: &ReadModelFacade<AuthorView>,
) -> Result<CachedProjection<AuthorView>, ReadModelError> {
    authors.get_by_id(author_id).await
}
