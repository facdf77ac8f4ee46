//! Domain events for the Membership context.

use libris_core::error::DomainError;
use libris_core::event::{DomainEvent, EventMetadata, decode_payload};
use libris_core::event_store::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of [`UserCreated`].
pub const USER_CREATED: &str = "membership.user_created";

/// Emitted when a user registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    /// The user identifier.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

/// Event payload variants for the Membership context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEventKind {
    /// A user was created.
    UserCreated(UserCreated),
}

impl UserEventKind {
    /// The canonical kind name, also used as the bus channel.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UserCreated(_) => USER_CREATED,
        }
    }
}

/// Domain event envelope for the Membership context.
#[derive(Debug, Clone)]
pub struct UserEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: UserEventKind,
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("UserEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind: decode_payload(stored)?,
        })
    }
}
