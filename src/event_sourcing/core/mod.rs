// ============================================================================
// Event Sourcing Core - Generic Infrastructure Abstractions
// ============================================================================
//
// Generic, reusable pieces that work with ANY aggregate:
// - Event envelope and event traits
// - Event registry (kind name <-> payload type)
// - Aggregate trait and the AggregateRoot wrapper
//
// ============================================================================

pub mod aggregate;
pub mod event;
pub mod registry;

// Re-export core types for convenience
pub use aggregate::{Aggregate, AggregateRoot};
pub use event::{AggregateEvent, DomainEvent, EventEnvelope};
pub use registry::{EncodedEvent, EventRegistry, RegistryError};
