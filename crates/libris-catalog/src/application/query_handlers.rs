//! Query handlers for the Catalog context.

use libris_read_model::{CachedProjection, ReadModelError, ReadModelFacade};
use uuid::Uuid;

use crate::application::event_handlers::BookView;

/// Retrieves the cached book projection.
///
/// # Errors
///
/// Returns `ReadModelError::ProjectionMiss` if the book has not been
/// projected (yet), or any cache error.
pub async fn get_book_by_id(
    book_id: Uuid,
    books: &ReadModelFacade<BookView>,
) -> Result<CachedProjection<BookView>, ReadModelError> {
    books.get_by_id(book_id).await
}
