//! `PostgreSQL` implementation of the `EventStore` trait.
//!
//! Each stream owns a row in `event_streams` whose `version` column is the
//! guard: the append is a conditional update (or insert, for a new stream)
//! of that row inside the same transaction that inserts the events. The row
//! lock taken by the update serializes concurrent appends to one stream while
//! appends to other streams proceed independently.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, warn};
use uuid::Uuid;

use libris_core::error::DomainError;
use libris_core::event_store::{EventStore, StoredEvent, assign_sequence_numbers};

/// Default upper bound on a single append round trip.
pub const DEFAULT_APPEND_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
    append_timeout: Duration,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            append_timeout: DEFAULT_APPEND_TIMEOUT,
        }
    }

    /// Overrides the append timeout. An append that exceeds it fails with
    /// `DomainError::AppendOutcomeUnknown`.
    #[must_use]
    pub fn with_append_timeout(mut self, append_timeout: Duration) -> Self {
        self.append_timeout = append_timeout;
        self
    }

    /// Applies the schema migrations bundled with the workspace.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a migration fails.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))
    }

    /// Returns the persisted version of a stream (0 for an unknown stream).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    pub async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM event_streams WHERE stream_id = $1")
                .bind(aggregate_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("current_version", e))?;
        Ok(version.unwrap_or(0))
    }

    /// Rolls back a losing append and reports the stream's committed version.
    async fn reject(
        &self,
        tx: Transaction<'_, Postgres>,
        aggregate_id: Uuid,
        expected_version: i64,
    ) -> DomainError {
        if let Err(e) = tx.rollback().await {
            return map_sqlx_error("rollback", e);
        }
        match self.current_version(aggregate_id).await {
            Ok(actual) => DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            },
            Err(e) => e,
        }
    }

    async fn try_append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        if events.is_empty() {
            let actual = self.current_version(aggregate_id).await?;
            if actual != expected_version {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual,
                });
            }
            return Ok(actual);
        }

        let stamped = assign_sequence_numbers(aggregate_id, expected_version, events);
        #[allow(clippy::cast_possible_wrap)]
        let new_version = expected_version + stamped.len() as i64;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        if !advance_stream(&mut tx, aggregate_id, expected_version, new_version).await? {
            return Err(self.reject(tx, aggregate_id, expected_version).await);
        }

        for event in &stamped {
            match insert_event(&mut tx, event).await {
                Ok(()) => {}
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(self.reject(tx, aggregate_id, expected_version).await);
                }
                Err(other) => return Err(map_sqlx_error("insert_event", other)),
            }
        }

        // Once COMMIT has been sent the server may have applied it even if
        // the reply is lost.
        tx.commit().await.map_err(|e| {
            warn!(%aggregate_id, error = %e, "commit failed; append outcome unknown");
            DomainError::AppendOutcomeUnknown(aggregate_id)
        })?;

        Ok(new_version)
    }
}

/// Moves the stream row from `expected_version` to `new_version`. Returns
/// `false` if the row was not at `expected_version`.
async fn advance_stream(
    tx: &mut Transaction<'_, Postgres>,
    aggregate_id: Uuid,
    expected_version: i64,
    new_version: i64,
) -> Result<bool, DomainError> {
    let result = if expected_version == 0 {
        sqlx::query(
            "INSERT INTO event_streams (stream_id, version) VALUES ($1, $2) \
             ON CONFLICT (stream_id) DO NOTHING",
        )
        .bind(aggregate_id)
        .bind(new_version)
        .execute(&mut **tx)
        .await
    } else {
        sqlx::query(
            "UPDATE event_streams SET version = $3, updated_at = NOW() \
             WHERE stream_id = $1 AND version = $2",
        )
        .bind(aggregate_id)
        .bind(expected_version)
        .bind(new_version)
        .execute(&mut **tx)
        .await
    }
    .map_err(|e| map_sqlx_error("advance_stream", e))?;

    Ok(result.rows_affected() == 1)
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &StoredEvent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO domain_events (
            event_id, aggregate_id, event_type, payload, sequence_number,
            correlation_id, causation_id, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(event.event_id)
    .bind(event.aggregate_id)
    .bind(&event.event_type)
    .bind(&event.payload)
    .bind(event.sequence_number)
    .bind(event.correlation_id)
    .bind(event.causation_id)
    .bind(event.occurred_at)
    .execute(&mut **tx)
    .await
    .map(|_| ())
}

fn row_to_event(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        sequence_number: row.try_get("sequence_number")?,
        correlation_id: row.try_get("correlation_id")?,
        causation_id: row.try_get("causation_id")?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
    })
}

fn map_sqlx_error(operation: &str, error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("{operation} failed: {error}"))
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self), err)]
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT event_id, aggregate_id, event_type, payload, sequence_number,
                   correlation_id, causation_id, occurred_at
            FROM domain_events
            WHERE aggregate_id = $1
            ORDER BY sequence_number ASC
            ",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_events", e))?;

        rows.iter()
            .map(row_to_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_event_row", e))
    }

    #[instrument(skip(self, events), fields(count = events.len()), err)]
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<i64, DomainError> {
        tokio::time::timeout(
            self.append_timeout,
            self.try_append(aggregate_id, expected_version, events),
        )
        .await
        .unwrap_or_else(|_| {
            warn!(%aggregate_id, timeout = ?self.append_timeout, "append timed out");
            Err(DomainError::AppendOutcomeUnknown(aggregate_id))
        })
    }
}
