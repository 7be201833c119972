// ============================================================================
// Event Sourcing Store - Generic Persistence Layer
// ============================================================================
//
// `EventLog` is the backend contract over encoded records; `EventStore<E>`
// is the typed layer aggregates talk to. Two backends ship:
// - `InMemoryEventLog` for tests and local runs
// - `PostgresEventLog` for durable storage
//
// ============================================================================

pub mod errors;
pub mod event_store;
pub mod in_memory;
pub mod log;
pub mod postgres;

pub use errors::EventStoreError;
pub use event_store::{EventStore, EventStream, SkipReason, SkippedEvent};
pub use in_memory::InMemoryEventLog;
pub use log::{EventLog, NewEvent, StoredEvent, StoredEventMetadata};
pub use postgres::PostgresEventLog;
