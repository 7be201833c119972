use uuid::Uuid;

use crate::event_sourcing::core::RegistryError;
use crate::utils::IsTransient;

// ============================================================================
// Event Store Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Optimistic check failed. Nothing was persisted; reload and retry.
    #[error("Concurrency conflict on aggregate {aggregate_id}: expected version {expected}, but current is {actual}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// The id already belongs to a stream of another aggregate type.
    #[error("Aggregate {aggregate_id} is a {stored}, not a {requested}")]
    AggregateTypeMismatch {
        aggregate_id: Uuid,
        stored: String,
        requested: String,
    },

    /// An event could not be encoded for append. This is a programming error
    /// (usually a kind missing from the registry).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to encode event metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EventStoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

impl IsTransient for EventStoreError {
    fn is_transient(&self) -> bool {
        self.is_conflict()
    }
}
