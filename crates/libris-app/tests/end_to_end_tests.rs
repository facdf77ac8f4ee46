//! End-to-end tests running commands through the in-memory pipeline and
//! reading the results back from the projections.

use std::sync::Arc;
use std::time::Duration;

use libris_app::{Backends, Services, compose};
use libris_catalog::application::command_handlers::{
    handle_change_book_author, handle_create_book, handle_rename_book,
};
use libris_catalog::application::query_handlers::get_book_by_id;
use libris_catalog::domain::commands::{ChangeBookAuthor, CreateBook, RenameBook};
use libris_core::aggregate::AggregateRoot;
use libris_core::error::DomainError;
use libris_membership::application::command_handlers::handle_create_user;
use libris_membership::application::query_handlers::{get_author_by_id, get_user_by_id};
use libris_membership::domain::commands::CreateUser;
use libris_read_model::{CachedProjection, ReadModelError, ReadModelFacade};
use libris_test_support::FixedClock;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Polls `facade` until the projection for `id` reaches `version`.
async fn wait_for_version<T>(
    facade: &ReadModelFacade<T>,
    id: Uuid,
    version: i64,
) -> CachedProjection<T>
where
    T: DeserializeOwned,
{
    for _ in 0..200 {
        if let Ok(projection) = facade.get_by_id(id).await {
            if projection.version >= version {
                return projection;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("projection {id} never reached version {version}");
}

fn services() -> Services {
    compose(Backends::in_memory(), Arc::new(FixedClock::default()))
}

async fn create_user(services: &Services, name: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    let command = CreateUser {
        correlation_id: Uuid::new_v4(),
        user_id,
        name: name.to_owned(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
    };
    handle_create_user(&command, services.clock.as_ref(), &services.users)
        .await
        .unwrap();
    user_id
}

async fn create_book(services: &Services, title: &str, author_id: Uuid) -> Uuid {
    let book_id = Uuid::new_v4();
    let command = CreateBook {
        correlation_id: Uuid::new_v4(),
        book_id,
        title: title.to_owned(),
        author_id,
    };
    handle_create_book(&command, services.clock.as_ref(), &services.books)
        .await
        .unwrap();
    book_id
}

#[tokio::test]
async fn test_user_created_is_projected_as_user_and_author() {
    // Arrange
    let services = services();
    let worker = services.start_projector().await.unwrap();

    // Act
    let user_id = create_user(&services, "Ursula Le Guin").await;

    // Assert
    let author = wait_for_version(&services.author_views, user_id, 1).await;
    assert_eq!(author.view.name, "Ursula Le Guin");
    let user = get_user_by_id(user_id, &services.user_views).await.unwrap();
    assert_eq!(user.view.email, "ursula.le.guin@example.com");
    assert_eq!(user.version, 1);
    let author = get_author_by_id(user_id, &services.author_views)
        .await
        .unwrap();
    assert_eq!(author.view.author_id, user_id);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_book_lifecycle_is_reflected_in_the_book_projection() {
    // Arrange
    let services = services();
    let worker = services.start_projector().await.unwrap();
    let first_author = create_user(&services, "Ursula Le Guin").await;
    let second_author = create_user(&services, "Octavia Butler").await;
    wait_for_version(&services.author_views, second_author, 1).await;

    // Act
    let book_id = create_book(&services, "The Dispossessed", first_author).await;
    let created = wait_for_version(&services.book_views, book_id, 1).await;

    handle_change_book_author(
        &ChangeBookAuthor {
            correlation_id: Uuid::new_v4(),
            book_id,
            author_id: second_author,
        },
        services.clock.as_ref(),
        &services.books,
    )
    .await
    .unwrap();
    let reassigned = wait_for_version(&services.book_views, book_id, 2).await;

    handle_rename_book(
        &RenameBook {
            correlation_id: Uuid::new_v4(),
            book_id,
            title: "Kindred".to_owned(),
        },
        services.clock.as_ref(),
        &services.books,
    )
    .await
    .unwrap();
    let renamed = wait_for_version(&services.book_views, book_id, 3).await;

    // Assert
    assert_eq!(created.view.title, "The Dispossessed");
    assert_eq!(created.view.author_id, first_author);
    assert!(created.view.author.is_none());

    assert_eq!(reassigned.view.author_id, second_author);
    let embedded = reassigned.view.author.unwrap();
    assert_eq!(embedded.author_id, second_author);
    assert_eq!(embedded.name, "Octavia Butler");

    assert_eq!(renamed.view.title, "Kindred");
    assert_eq!(renamed.view.author_id, second_author);
    assert_eq!(renamed.version, 3);

    let queried = get_book_by_id(book_id, &services.book_views).await.unwrap();
    assert_eq!(queried, renamed);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_author_change_before_author_projection_is_not_lost() {
    // Arrange
    let services = services();
    let worker = services.start_projector().await.unwrap();
    let first_author = create_user(&services, "Ursula Le Guin").await;
    let book_id = create_book(&services, "The Dispossessed", first_author).await;
    wait_for_version(&services.book_views, book_id, 1).await;
    let unprojected_author = Uuid::new_v4();

    // Act
    handle_change_book_author(
        &ChangeBookAuthor {
            correlation_id: Uuid::new_v4(),
            book_id,
            author_id: unprojected_author,
        },
        services.clock.as_ref(),
        &services.books,
    )
    .await
    .unwrap();
    handle_rename_book(
        &RenameBook {
            correlation_id: Uuid::new_v4(),
            book_id,
            title: "The Left Hand of Darkness".to_owned(),
        },
        services.clock.as_ref(),
        &services.books,
    )
    .await
    .unwrap();
    let projected = wait_for_version(&services.book_views, book_id, 3).await;

    // Assert
    let book = services.books.get_by_id(book_id).await.unwrap();
    assert_eq!(book.author_id(), Some(unprojected_author));
    assert_eq!(projected.view.author_id, unprojected_author);
    assert!(projected.view.author.is_none());
    assert_eq!(projected.view.title, "The Left Hand of Darkness");

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_book_is_a_projection_miss() {
    let services = services();

    let result = get_book_by_id(Uuid::new_v4(), &services.book_views).await;

    assert!(matches!(result, Err(ReadModelError::ProjectionMiss { .. })));
}

#[tokio::test]
async fn test_concurrent_saves_from_the_same_version_conflict_once() {
    // Arrange
    let services = services();
    let author_id = create_user(&services, "Ursula Le Guin").await;
    let book_id = create_book(&services, "The Lathe of Heaven", author_id).await;
    let clock = FixedClock::default();

    let mut first = services.books.get_by_id(book_id).await.unwrap();
    let mut second = services.books.get_by_id(book_id).await.unwrap();
    first.rename("Always Coming Home", Uuid::new_v4(), &clock).unwrap();
    second.rename("The Word for World Is Forest", Uuid::new_v4(), &clock).unwrap();

    // Act
    let (a, b) = tokio::join!(
        services.books.save(&mut first, 1),
        services.books.save(&mut second, 1),
    );

    // Assert
    let conflicts = [&a, &b]
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(DomainError::ConcurrencyConflict {
                    expected: 1,
                    actual: 2,
                    ..
                })
            )
        })
        .count();
    assert_eq!(conflicts, 1);
    assert!(a.is_ok() || b.is_ok());

    let reloaded = services.books.get_by_id(book_id).await.unwrap();
    assert_eq!(reloaded.version(), 2);
}

#[tokio::test]
async fn test_projector_stops_on_shutdown() {
    let services = Services::in_memory();
    let worker = services.start_projector().await.unwrap();
    let token = worker.cancellation_token();

    worker.shutdown().await.unwrap();

    assert!(token.is_cancelled());
}
