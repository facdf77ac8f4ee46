//! Event handlers maintaining the user and author projections.

use std::sync::Arc;

use async_trait::async_trait;
use libris_core::event::DomainEvent;
use libris_core::event_store::StoredEvent;
use libris_read_model::{EventHandler, HandlerError, ProjectionStore, projection_key};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::events::{USER_CREATED, UserCreated, UserEvent, UserEventKind};

/// Entity kind of the user projection.
pub const USER_PROJECTION: &str = "users";
/// Entity kind of the author projection.
pub const AUTHOR_PROJECTION: &str = "authors";

/// Read-only view of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// The user identifier.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

/// Public author record, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    /// The author's user id.
    pub author_id: Uuid,
    /// Display name.
    pub name: String,
}

fn decode_created(event: &StoredEvent) -> Result<UserCreated, HandlerError> {
    let user_event =
        UserEvent::from_stored(event).map_err(|e| HandlerError::Decode(e.to_string()))?;
    let UserEventKind::UserCreated(created) = user_event.kind;
    Ok(created)
}

/// Writes `users:<user_id>` on `membership.user_created`.
#[derive(Debug)]
pub struct UserCreatedProjection {
    projections: Arc<ProjectionStore>,
}

impl UserCreatedProjection {
    /// Creates the handler.
    #[must_use]
    pub fn new(projections: Arc<ProjectionStore>) -> Self {
        Self { projections }
    }
}

#[async_trait]
impl EventHandler for UserCreatedProjection {
    fn name(&self) -> &'static str {
        "user_created_projection"
    }

    fn event_type(&self) -> &'static str {
        USER_CREATED
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let created = decode_created(event)?;
        let key = projection_key(USER_PROJECTION, created.user_id);
        let view = UserView {
            user_id: created.user_id,
            name: created.name,
            email: created.email,
        };
        let outcome = self.projections.create(&key, event, view).await?;
        debug!(%key, ?outcome, "user projection written");
        Ok(())
    }
}

/// Writes `authors:<user_id>` on `membership.user_created`.
#[derive(Debug)]
pub struct AuthorCreatedProjection {
    projections: Arc<ProjectionStore>,
}

impl AuthorCreatedProjection {
    /// Creates the handler.
    #[must_use]
    pub fn new(projections: Arc<ProjectionStore>) -> Self {
        Self { projections }
    }
}

#[async_trait]
impl EventHandler for AuthorCreatedProjection {
    fn name(&self) -> &'static str {
        "author_created_projection"
    }

    fn event_type(&self) -> &'static str {
        USER_CREATED
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let created = decode_created(event)?;
        let key = projection_key(AUTHOR_PROJECTION, created.user_id);
        let view = AuthorView {
            author_id: created.user_id,
            name: created.name,
        };
        let outcome = self.projections.create(&key, event, view).await?;
        debug!(%key, ?outcome, "author projection written");
        Ok(())
    }
}
