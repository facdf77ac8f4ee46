//! Cached projection documents and the guarded merge that updates them.
//!
//! A projection is stored as its view flattened together with a top-level
//! `version` holding the sequence number of the last event applied to it.
//! Writes to one key are serialized in-process and an event is only applied
//! if its sequence number is newer than `version`, so duplicate or late
//! deliveries never overwrite fresher data. Two processes writing the same
//! key can still race; the cache offers no compare-and-set here.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use libris_core::event_store::StoredEvent;
use libris_core::locks::KeyedLocks;

use crate::cache::ProjectionCache;
use crate::error::HandlerError;

/// Builds the cache key `"<entity-kind>:<id>"`.
#[must_use]
pub fn projection_key(entity_kind: &str, id: Uuid) -> String {
    format!("{entity_kind}:{id}")
}

/// A projection document as cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProjection<T> {
    /// The view fields.
    #[serde(flatten)]
    pub view: T,
    /// Sequence number of the last event folded into `view`.
    pub version: i64,
}

#[derive(Deserialize)]
struct VersionMarker {
    version: i64,
}

/// What a projection write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The document was written.
    Applied,
    /// No document exists yet; updates before creation are dropped.
    Missing,
    /// The document already reflects this event or a later one.
    Stale,
}

/// Guarded read-modify-write access to cached projections.
pub struct ProjectionStore {
    cache: Arc<dyn ProjectionCache>,
    locks: KeyedLocks<String>,
}

impl std::fmt::Debug for ProjectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionStore")
            .field("locked_keys", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl ProjectionStore {
    /// Creates a store writing into `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn ProjectionCache>) -> Self {
        Self {
            cache,
            locks: KeyedLocks::new(),
        }
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> Arc<dyn ProjectionCache> {
        Arc::clone(&self.cache)
    }

    /// Writes the initial document for `key` from a creation event.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError` if the cache fails or holds an undecodable
    /// document.
    pub async fn create<T>(
        &self,
        key: &str,
        event: &StoredEvent,
        view: T,
    ) -> Result<MergeOutcome, HandlerError>
    where
        T: Serialize + Send,
    {
        let _guard = self.locks.lock(key.to_owned()).await;

        if let Some(raw) = self.cache.get(key).await? {
            let marker: VersionMarker = decode(&raw)?;
            if event.sequence_number <= marker.version {
                debug!(key, sequence_number = event.sequence_number, cached = marker.version, "stale create skipped");
                return Ok(MergeOutcome::Stale);
            }
        }

        self.write(
            key,
            &CachedProjection {
                view,
                version: event.sequence_number,
            },
        )
        .await?;
        Ok(MergeOutcome::Applied)
    }

    /// Applies `event` to the document cached under `key`.
    ///
    /// Nothing is written when the document is absent or already at or past
    /// the event's sequence number.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError` if the cache fails or the cached document does
    /// not decode as `T`.
    pub async fn merge<T, F>(
        &self,
        key: &str,
        event: &StoredEvent,
        apply: F,
    ) -> Result<MergeOutcome, HandlerError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce(&mut T) + Send,
    {
        let _guard = self.locks.lock(key.to_owned()).await;

        let Some(raw) = self.cache.get(key).await? else {
            debug!(key, "no cached projection; update skipped");
            return Ok(MergeOutcome::Missing);
        };
        let mut doc: CachedProjection<T> = decode(&raw)?;
        if event.sequence_number <= doc.version {
            debug!(key, sequence_number = event.sequence_number, cached = doc.version, "stale update skipped");
            return Ok(MergeOutcome::Stale);
        }

        apply(&mut doc.view);
        doc.version = event.sequence_number;
        self.write(key, &doc).await?;
        Ok(MergeOutcome::Applied)
    }

    /// Reads the document cached under `key`.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError` if the cache fails or the document does not
    /// decode as `T`.
    pub async fn load<T>(&self, key: &str) -> Result<Option<CachedProjection<T>>, HandlerError>
    where
        T: DeserializeOwned,
    {
        match self.cache.get(key).await? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(
        &self,
        key: &str,
        doc: &CachedProjection<T>,
    ) -> Result<(), HandlerError> {
        let raw = serde_json::to_string(doc).map_err(|e| HandlerError::Decode(e.to_string()))?;
        self.cache.set(key, raw).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, HandlerError> {
    serde_json::from_str(raw).map_err(|e| HandlerError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryProjectionCache;
    use libris_test_support::make_stored_event;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct NameView {
        name: String,
    }

    fn event(id: Uuid, event_type: &str, sequence_number: i64) -> StoredEvent {
        make_stored_event(id, event_type, serde_json::json!({}), sequence_number)
    }

    fn store() -> (Arc<InMemoryProjectionCache>, ProjectionStore) {
        let cache = Arc::new(InMemoryProjectionCache::new());
        let store = ProjectionStore::new(cache.clone());
        (cache, store)
    }

    #[test]
    fn test_projection_key_is_kind_colon_id() {
        let id = Uuid::nil();

        assert_eq!(
            projection_key("books", id),
            "books:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_cached_projection_serializes_flat_with_version() {
        let doc = CachedProjection {
            view: NameView { name: "x".to_owned() },
            version: 3,
        };

        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json, serde_json::json!({"name": "x", "version": 3}));
    }

    #[tokio::test]
    async fn test_create_writes_document_at_event_sequence() {
        // Arrange
        let (_cache, store) = store();
        let id = Uuid::new_v4();
        let key = projection_key("things", id);

        // Act
        let outcome = store
            .create(&key, &event(id, "Created", 1), NameView { name: "x".to_owned() })
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, MergeOutcome::Applied);
        let doc = store.load::<NameView>(&key).await.unwrap().unwrap();
        assert_eq!(doc.view.name, "x");
        assert_eq!(doc.version, 1);
    }

    #[tokio::test]
    async fn test_merge_updates_existing_projection() {
        // Arrange
        let (_cache, store) = store();
        let id = Uuid::new_v4();
        let key = projection_key("things", id);
        store
            .create(&key, &event(id, "Created", 1), NameView { name: "x".to_owned() })
            .await
            .unwrap();

        // Act
        let outcome = store
            .merge(&key, &event(id, "Renamed", 2), |view: &mut NameView| {
                view.name = "y".to_owned();
            })
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, MergeOutcome::Applied);
        let doc = store.load::<NameView>(&key).await.unwrap().unwrap();
        assert_eq!(doc.view.name, "y");
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn test_merge_without_projection_writes_nothing() {
        let (cache, store) = store();
        let id = Uuid::new_v4();
        let key = projection_key("things", id);

        let outcome = store
            .merge(&key, &event(id, "Renamed", 2), |view: &mut NameView| {
                view.name = "y".to_owned();
            })
            .await
            .unwrap();

        assert_eq!(outcome, MergeOutcome::Missing);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_merge_skips_events_at_or_behind_cached_version() {
        // Arrange
        let (_cache, store) = store();
        let id = Uuid::new_v4();
        let key = projection_key("things", id);
        store
            .create(&key, &event(id, "Created", 1), NameView { name: "x".to_owned() })
            .await
            .unwrap();
        store
            .merge(&key, &event(id, "Renamed", 3), |view: &mut NameView| {
                view.name = "newest".to_owned();
            })
            .await
            .unwrap();

        // Act
        let late = store
            .merge(&key, &event(id, "Renamed", 2), |view: &mut NameView| {
                view.name = "older".to_owned();
            })
            .await
            .unwrap();
        let duplicate = store
            .merge(&key, &event(id, "Renamed", 3), |view: &mut NameView| {
                view.name = "again".to_owned();
            })
            .await
            .unwrap();

        // Assert
        assert_eq!(late, MergeOutcome::Stale);
        assert_eq!(duplicate, MergeOutcome::Stale);
        let doc = store.load::<NameView>(&key).await.unwrap().unwrap();
        assert_eq!(doc.view.name, "newest");
        assert_eq!(doc.version, 3);
    }

    #[tokio::test]
    async fn test_redelivered_create_does_not_reset_projection() {
        let (_cache, store) = store();
        let id = Uuid::new_v4();
        let key = projection_key("things", id);
        let created = event(id, "Created", 1);
        store
            .create(&key, &created, NameView { name: "x".to_owned() })
            .await
            .unwrap();
        store
            .merge(&key, &event(id, "Renamed", 2), |view: &mut NameView| {
                view.name = "y".to_owned();
            })
            .await
            .unwrap();

        let outcome = store
            .create(&key, &created, NameView { name: "x".to_owned() })
            .await
            .unwrap();

        assert_eq!(outcome, MergeOutcome::Stale);
        let doc = store.load::<NameView>(&key).await.unwrap().unwrap();
        assert_eq!(doc.view.name, "y");
    }

    #[tokio::test]
    async fn test_concurrent_merges_on_one_key_lose_no_update() {
        // Arrange
        #[derive(Debug, Serialize, Deserialize)]
        struct Tags {
            tags: Vec<i64>,
        }
        let (_cache, store) = store();
        let store = Arc::new(store);
        let id = Uuid::new_v4();
        let key = projection_key("things", id);
        store
            .create(&key, &event(id, "Created", 1), Tags { tags: Vec::new() })
            .await
            .unwrap();

        // Act
        let tasks: Vec<_> = (2..=20)
            .map(|seq| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move {
                    store
                        .merge(&key, &event(id, "Tagged", seq), |view: &mut Tags| {
                            view.tags.push(seq);
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Assert
        let doc = store.load::<Tags>(&key).await.unwrap().unwrap();
        assert_eq!(doc.version, 20);
        assert!(doc.view.tags.contains(&20));
        let mut sorted = doc.view.tags.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, doc.view.tags);
    }

    #[tokio::test]
    async fn test_undecodable_cached_document_is_a_decode_error() {
        let (cache, store) = store();
        let id = Uuid::new_v4();
        let key = projection_key("things", id);
        cache.set(&key, "not json".to_owned()).await.unwrap();

        let result = store
            .merge(&key, &event(id, "Renamed", 2), |view: &mut NameView| {
                view.name = "y".to_owned();
            })
            .await;

        assert!(matches!(result, Err(HandlerError::Decode(_))));
    }
}
