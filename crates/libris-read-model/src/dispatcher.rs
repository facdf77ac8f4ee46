//! Fan-out of bus messages to registered handlers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, instrument};

use libris_core::bus::BusMessage;

use crate::handler::HandlerRegistry;

/// Outcome of dispatching one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that completed successfully.
    pub handled: usize,
    /// Handlers that failed (or could not run because the body did not
    /// decode).
    pub failed: usize,
}

/// Decodes incoming messages and runs every handler registered for their
/// kind.
///
/// Handlers run one after another in registration order. A failing or
/// panicking handler is logged and counted; the remaining handlers still run
/// and the message is considered delivered either way.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    registry: Arc<HandlerRegistry>,
}

impl EventDispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The handler registry.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatches one message.
    #[instrument(skip_all, fields(channel = %message.channel))]
    pub async fn dispatch(&self, message: &BusMessage) -> DispatchReport {
        let handlers = self.registry.handlers_for(&message.channel);
        if handlers.is_empty() {
            debug!("no handler registered");
            return DispatchReport::default();
        }

        let event = match message.decode() {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "undecodable message dropped");
                return DispatchReport {
                    handled: 0,
                    failed: handlers.len(),
                };
            }
        };

        let mut report = DispatchReport::default();
        for handler in handlers {
            let outcome = AssertUnwindSafe(handler.handle(&event))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => report.handled += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(
                        handler = handler.name(),
                        aggregate_id = %event.aggregate_id,
                        sequence_number = event.sequence_number,
                        error = %e,
                        "event handler failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    error!(
                        handler = handler.name(),
                        aggregate_id = %event.aggregate_id,
                        sequence_number = event.sequence_number,
                        "event handler panicked"
                    );
                }
            }
        }
        debug!(handled = report.handled, failed = report.failed, "message dispatched");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::EventHandler;
    use async_trait::async_trait;
    use libris_core::event_store::StoredEvent;
    use libris_test_support::make_stored_event;
    use std::sync::Mutex;
    use uuid::Uuid;

    type Journal = Arc<Mutex<Vec<&'static str>>>;

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct ScriptedHandler {
        name: &'static str,
        behaviour: Behaviour,
        journal: Journal,
    }

    #[async_trait]
    impl EventHandler for ScriptedHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn event_type(&self) -> &'static str {
            "catalog.book_created"
        }

        async fn handle(&self, _event: &StoredEvent) -> Result<(), HandlerError> {
            self.journal.lock().unwrap().push(self.name);
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(HandlerError::Decode("bad payload".to_owned())),
                Behaviour::Panic => panic!("handler bug"),
            }
        }
    }

    fn scripted(name: &'static str, behaviour: Behaviour, journal: &Journal) -> Arc<dyn EventHandler> {
        Arc::new(ScriptedHandler {
            name,
            behaviour,
            journal: Arc::clone(journal),
        })
    }

    fn message(event_type: &str) -> BusMessage {
        BusMessage::encode(&make_stored_event(
            Uuid::new_v4(),
            event_type,
            serde_json::json!({}),
            1,
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_runs_all_handlers_in_registration_order() {
        // Arrange
        let journal = Journal::default();
        let dispatcher = EventDispatcher::new(HandlerRegistry::new(vec![
            scripted("first", Behaviour::Succeed, &journal),
            scripted("second", Behaviour::Succeed, &journal),
        ]));

        // Act
        let report = dispatcher.dispatch(&message("catalog.book_created")).await;

        // Assert
        assert_eq!(report, DispatchReport { handled: 2, failed: 0 });
        assert_eq!(*journal.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_siblings() {
        // Arrange
        let journal = Journal::default();
        let dispatcher = EventDispatcher::new(HandlerRegistry::new(vec![
            scripted("broken", Behaviour::Fail, &journal),
            scripted("healthy", Behaviour::Succeed, &journal),
        ]));

        // Act
        let report = dispatcher.dispatch(&message("catalog.book_created")).await;

        // Assert
        assert_eq!(report, DispatchReport { handled: 1, failed: 1 });
        assert_eq!(*journal.lock().unwrap(), vec!["broken", "healthy"]);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let journal = Journal::default();
        let dispatcher = EventDispatcher::new(HandlerRegistry::new(vec![
            scripted("panics", Behaviour::Panic, &journal),
            scripted("healthy", Behaviour::Succeed, &journal),
        ]));

        let report = dispatcher.dispatch(&message("catalog.book_created")).await;

        assert_eq!(report, DispatchReport { handled: 1, failed: 1 });
        assert_eq!(*journal.lock().unwrap(), vec!["panics", "healthy"]);
    }

    #[tokio::test]
    async fn test_message_without_handlers_is_ignored() {
        let journal = Journal::default();
        let dispatcher = EventDispatcher::new(HandlerRegistry::new(vec![scripted(
            "only",
            Behaviour::Succeed,
            &journal,
        )]));

        let report = dispatcher.dispatch(&message("catalog.book_renamed")).await;

        assert_eq!(report, DispatchReport::default());
        assert!(journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_body_counts_every_handler_as_failed() {
        let journal = Journal::default();
        let dispatcher = EventDispatcher::new(HandlerRegistry::new(vec![
            scripted("a", Behaviour::Succeed, &journal),
            scripted("b", Behaviour::Succeed, &journal),
        ]));
        let garbage = BusMessage {
            channel: "catalog.book_created".to_owned(),
            payload: "{".to_owned(),
        };

        let report = dispatcher.dispatch(&garbage).await;

        assert_eq!(report, DispatchReport { handled: 0, failed: 2 });
        assert!(journal.lock().unwrap().is_empty());
    }
}
