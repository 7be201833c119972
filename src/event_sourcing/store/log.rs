use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::EventStoreError;

// ============================================================================
// Event Log - persistence contract for stored event records
// ============================================================================
//
// Backends only see encoded records. Each one must provide:
// 1. Atomic multi-record append guarded by (aggregate_id, expected_version)
// 2. Gapless versions per aggregate, starting at 1
// 3. Ordered range scans by version
//
// ============================================================================

/// An encoded event waiting for a version.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: String,
    pub metadata: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
}

/// A persisted event record. `(aggregate_id, version)` is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub version: i64,
    pub event_type: String,
    pub payload: String,
    pub metadata: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
}

impl StoredEvent {
    pub fn from_new(aggregate_id: Uuid, aggregate_type: &str, version: i64, event: NewEvent) -> Self {
        Self {
            event_id: event.event_id,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            version,
            event_type: event.event_type,
            payload: event.payload,
            metadata: event.metadata,
            occurred_at: event.occurred_at,
            actor_id: event.actor_id,
        }
    }
}

/// Side-channel stored next to each payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEventMetadata {
    pub schema_version: i32,
    pub origin: String,
    pub persisted_at: DateTime<Utc>,
}

impl StoredEventMetadata {
    pub const ORIGIN: &'static str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    pub fn new(schema_version: i32) -> Self {
        Self {
            schema_version,
            origin: Self::ORIGIN.to_string(),
            persisted_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Persist `events` as versions `expected_version + 1 ..` in one atomic
    /// unit, or fail with `ConcurrencyConflict` if the aggregate is no longer
    /// at `expected_version`. A stream keeps the `aggregate_type` of its first
    /// record; a batch for another type fails with `AggregateTypeMismatch`.
    /// An empty batch returns `expected_version` without any check.
    async fn append(
        &self,
        aggregate_id: Uuid,
        aggregate_type: &str,
        events: Vec<NewEvent>,
        expected_version: i64,
    ) -> Result<i64, EventStoreError>;

    /// Records with `version > from_version`, ascending.
    async fn load(&self, aggregate_id: Uuid, from_version: i64) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Highest persisted version, or 0 for an id that was never written.
    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError>;

    /// Every record of one aggregate type, ordered by occurrence time,
    /// then aggregate id, then version.
    async fn load_by_aggregate_type(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError>;
}
