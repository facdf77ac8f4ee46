//! A projection handler built on `ProjectionStore`, driven through the
//! dispatcher the way the worker drives it.

use std::sync::Arc;

use async_trait::async_trait;
use libris_core::bus::BusMessage;
use libris_core::event_store::StoredEvent;
use libris_read_model::{
    DispatchReport, EventDispatcher, EventHandler, HandlerError, HandlerRegistry,
    InMemoryProjectionCache, ProjectionCache, ProjectionStore, ReadModelFacade, projection_key,
};
use libris_test_support::make_stored_event;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ThingView {
    name: String,
}

#[derive(Deserialize)]
struct NamePayload {
    name: String,
}

struct RenamedHandler {
    projections: Arc<ProjectionStore>,
}

#[async_trait]
impl EventHandler for RenamedHandler {
    fn name(&self) -> &'static str {
        "thing_renamed_projection"
    }

    fn event_type(&self) -> &'static str {
        "Renamed"
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), HandlerError> {
        let payload: NamePayload = serde_json::from_value(event.payload.clone())
            .map_err(|e| HandlerError::Decode(e.to_string()))?;
        self.projections
            .merge(
                &projection_key("things", event.aggregate_id),
                event,
                |view: &mut ThingView| view.name = payload.name,
            )
            .await?;
        Ok(())
    }
}

fn renamed(a1: Uuid) -> BusMessage {
    BusMessage::encode(&make_stored_event(
        a1,
        "Renamed",
        serde_json::json!({"name": "y"}),
        2,
    ))
    .unwrap()
}

fn wiring() -> (Arc<InMemoryProjectionCache>, EventDispatcher) {
    let cache = Arc::new(InMemoryProjectionCache::new());
    let projections = Arc::new(ProjectionStore::new(cache.clone()));
    let dispatcher = EventDispatcher::new(
        HandlerRegistry::default().with(Arc::new(RenamedHandler { projections })),
    );
    (cache, dispatcher)
}

#[tokio::test]
async fn test_renamed_updates_existing_projection() {
    // Arrange
    let (cache, dispatcher) = wiring();
    let a1 = Uuid::new_v4();
    cache
        .set(
            &projection_key("things", a1),
            r#"{"name":"x","version":1}"#.to_owned(),
        )
        .await
        .unwrap();

    // Act
    let report = dispatcher.dispatch(&renamed(a1)).await;

    // Assert
    assert_eq!(report, DispatchReport { handled: 1, failed: 0 });
    let facade = ReadModelFacade::<ThingView>::new(cache, "things");
    let doc = facade.get_by_id(a1).await.unwrap();
    assert_eq!(doc.view.name, "y");
    assert_eq!(doc.version, 2);
}

#[tokio::test]
async fn test_renamed_without_projection_performs_no_write() {
    // Arrange
    let (cache, dispatcher) = wiring();
    let a1 = Uuid::new_v4();

    // Act
    let report = dispatcher.dispatch(&renamed(a1)).await;

    // Assert
    assert_eq!(report, DispatchReport { handled: 1, failed: 0 });
    assert!(cache.is_empty().await);
    let facade = ReadModelFacade::<ThingView>::new(cache, "things");
    assert!(facade.get_by_id(a1).await.unwrap_err().is_miss());
}
