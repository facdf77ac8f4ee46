//! Aggregate roots for the Membership context.

use libris_core::aggregate::AggregateRoot;
use libris_core::clock::Clock;
use libris_core::error::DomainError;
use libris_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{UserCreated, UserEvent, UserEventKind};

/// The aggregate root for a library member.
#[derive(Debug)]
pub struct User {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Display name; `None` until the user is created.
    pub(crate) name: Option<String>,
    /// Contact address; `None` until the user is created.
    pub(crate) email: Option<String>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<UserEvent>,
}

impl User {
    /// Returns `true` once the user has been created.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.name.is_some() || !self.uncommitted_events.is_empty()
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Contact address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Registers the user, producing a `UserCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the user already exists, the name
    /// is blank, or the email has no `@`.
    pub fn create(
        &mut self,
        name: &str,
        email: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.exists() {
            return Err(DomainError::Validation(format!(
                "user {} already exists",
                self.id
            )));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("name must not be blank".to_owned()));
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(DomainError::Validation(format!("invalid email: {email}")));
        }

        let kind = UserEventKind::UserCreated(UserCreated {
            user_id: self.id,
            name: name.to_owned(),
            email: email.to_owned(),
        });
        let event = UserEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
        Ok(())
    }
}

impl AggregateRoot for User {
    type Event = UserEvent;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            name: None,
            email: None,
            uncommitted_events: Vec::new(),
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            UserEventKind::UserCreated(payload) => {
                self.name = Some(payload.name.clone());
                self.email = Some(payload.email.clone());
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn mark_committed(&mut self) {
        for event in std::mem::take(&mut self.uncommitted_events) {
            self.apply(&event);
        }
    }
}
