//! Event handlers and the kind-to-handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use libris_core::event_store::StoredEvent;

use crate::error::HandlerError;

/// Reacts to committed events of one kind.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &'static str;

    /// The event kind (and bus channel) this handler consumes.
    fn event_type(&self) -> &'static str;

    /// Handles one event.
    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError>;
}

/// Maps each event kind to its handlers, in registration order.
///
/// Built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_type: HashMap<&'static str, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    /// Builds a registry from `handlers`, keeping their order per kind.
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        handlers.into_iter().fold(Self::default(), Self::with)
    }

    /// Adds `handler` after any handler already registered for its kind.
    #[must_use]
    pub fn with(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.by_type
            .entry(handler.event_type())
            .or_default()
            .push(handler);
        self
    }

    /// Handlers registered for `event_type`, in order.
    #[must_use]
    pub fn handlers_for(&self, event_type: &str) -> &[Arc<dyn EventHandler>] {
        self.by_type
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every kind with at least one handler, sorted. These are the channels
    /// a process subscribes to.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.by_type.keys().map(|k| (*k).to_owned()).collect();
        channels.sort_unstable();
        channels
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (kind, handlers) in &self.by_type {
            let names: Vec<&str> = handlers.iter().map(|h| h.name()).collect();
            map.entry(kind, &names);
        }
        map.finish()
    }
}
