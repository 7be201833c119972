use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::errors::EventStoreError;
use super::log::{EventLog, NewEvent, StoredEvent};

// ============================================================================
// Postgres Event Log
// ============================================================================
//
// Append runs inside one transaction:
// 1. Read MAX(version) for the aggregate
// 2. Compare with the expected version
// 3. Insert the batch
//
// If another writer commits between 1 and 3, the unique constraint on
// (aggregate_id, version) rejects our insert and we report a conflict.
// Dropping the transaction (error or cancelled future) rolls it back, so no
// version is ever half-allocated.
//
// ============================================================================

const CREATE_EVENTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS events (
    event_id        UUID PRIMARY KEY,
    aggregate_id    UUID NOT NULL,
    aggregate_type  VARCHAR(255) NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         TEXT NOT NULL,
    metadata        TEXT NOT NULL,
    version         BIGINT NOT NULL CHECK (version > 0),
    occurred_at     TIMESTAMPTZ NOT NULL,
    actor_id        UUID,
    CONSTRAINT uq_events_aggregate_version UNIQUE (aggregate_id, version)
)";

const CREATE_AGGREGATE_TYPE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_aggregate_type ON events (aggregate_type)";

const VERSION_CONSTRAINT: &str = "uq_events_aggregate_version";

const SELECT_COLUMNS: &str = "event_id, aggregate_id, aggregate_type, version, event_type,
    payload, metadata, occurred_at, actor_id";

#[derive(Debug, Clone)]
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EventStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "Connected to Postgres");
        Ok(Self::new(pool))
    }

    /// Create the events table and indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        sqlx::query(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_AGGREGATE_TYPE_INDEX).execute(&self.pool).await?;
        tracing::debug!("Event store schema ready");
        Ok(())
    }

    async fn version_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(version), 0)::BIGINT FROM events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn stream_type_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT aggregate_type FROM events WHERE aggregate_id = $1 ORDER BY version ASC LIMIT 1",
        )
        .bind(aggregate_id)
        .fetch_optional(&mut **tx)
        .await
    }
}

fn is_version_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(VERSION_CONSTRAINT)
        }
        _ => false,
    }
}

fn stored_event_from_row(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        version: row.try_get("version")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        metadata: row.try_get("metadata")?,
        occurred_at: row.try_get("occurred_at")?,
        actor_id: row.try_get("actor_id")?,
    })
}

#[async_trait]
impl EventLog for PostgresEventLog {
    #[instrument(skip(self, events), fields(event_count = events.len()), err)]
    async fn append(
        &self,
        aggregate_id: Uuid,
        aggregate_type: &str,
        events: Vec<NewEvent>,
        expected_version: i64,
    ) -> Result<i64, EventStoreError> {
        if events.is_empty() {
            return Ok(expected_version);
        }

        let mut tx = self.pool.begin().await?;

        if let Some(stored) = Self::stream_type_in_tx(&mut tx, aggregate_id).await? {
            if stored != aggregate_type {
                tx.rollback().await?;
                return Err(EventStoreError::AggregateTypeMismatch {
                    aggregate_id,
                    stored,
                    requested: aggregate_type.to_string(),
                });
            }
        }

        let current = Self::version_in_tx(&mut tx, aggregate_id).await?;
        if current != expected_version {
            tx.rollback().await?;
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current,
            });
        }

        let mut version = current;
        for event in events {
            version += 1;

            let inserted = sqlx::query(
                "INSERT INTO events (
                    event_id, aggregate_id, aggregate_type, event_type, payload,
                    metadata, version, occurred_at, actor_id
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(event.event_id)
            .bind(aggregate_id)
            .bind(aggregate_type)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(&event.metadata)
            .bind(version)
            .bind(event.occurred_at)
            .bind(event.actor_id)
            .execute(&mut *tx)
            .await;

            if let Err(err) = inserted {
                if is_version_violation(&err) {
                    // A concurrent writer won. Our transaction is aborted;
                    // report what the winner left behind.
                    drop(tx);
                    let actual = self.current_version(aggregate_id).await?;
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual,
                    });
                }
                return Err(err.into());
            }
        }

        tx.commit().await?;
        Ok(version)
    }

    #[instrument(skip(self), err)]
    async fn load(&self, aggregate_id: Uuid, from_version: i64) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM events
             WHERE aggregate_id = $1 AND version > $2
             ORDER BY version ASC"
        ))
        .bind(aggregate_id)
        .bind(from_version)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(stored_event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let version = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(version), 0)::BIGINT FROM events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(version)
    }

    #[instrument(skip(self), err)]
    async fn load_by_aggregate_type(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM events
             WHERE aggregate_type = $1
             ORDER BY occurred_at ASC, aggregate_id ASC, version ASC"
        ))
        .bind(aggregate_type)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(stored_event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

// ============================================================================
// Integration Tests (need a running Postgres)
// ============================================================================
//
// Run with:
//   DATABASE_URL=postgres://... cargo test -- --ignored
//
// ============================================================================
