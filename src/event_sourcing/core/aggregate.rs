use uuid::Uuid;

use super::event::{AggregateEvent, EventEnvelope};

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not stored directly)
// 2. Commands are validated before emitting events
// 3. Events represent facts that have already happened
// 4. `apply` is the only place attributes change, for commands and replay alike
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// `Default` is the empty, pre-genesis state that replay starts from.
///
/// Type Parameters:
/// - `Event`: The event family for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Default + Send + Sync {
    type Event: AggregateEvent;
    type Command: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stored alongside every event (e.g. "Account").
    fn aggregate_type() -> &'static str;

    /// Apply one event to the state. Must be deterministic and must not fail.
    fn apply(&mut self, event: &EventEnvelope<Self::Event>);

    /// Handle command and emit events (business logic). Returns an empty list
    /// when the command is a no-op in the current state.
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

/// An aggregate's state plus its identity, its committed version and the
/// events produced since it was loaded.
#[derive(Debug, Clone)]
pub struct AggregateRoot<A: Aggregate> {
    id: Uuid,
    version: i64,
    state: A,
    uncommitted: Vec<EventEnvelope<A::Event>>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// A fresh aggregate with no history. Issue a creation command next.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            state: A::default(),
            uncommitted: Vec::new(),
        }
    }

    /// Rebuild state by applying `events` in ascending version order.
    pub fn replay_from(id: Uuid, events: &[EventEnvelope<A::Event>]) -> Self {
        let version = events.last().map(|e| e.sequence_number).unwrap_or(0);
        Self::replay_at_version(id, events, version)
    }

    /// Like `replay_from`, but with the committed version supplied by the
    /// caller. Used when some stored records could not be decoded, so the last
    /// decoded event is not the last stored one.
    pub fn replay_at_version(id: Uuid, events: &[EventEnvelope<A::Event>], version: i64) -> Self {
        let mut state = A::default();
        for envelope in events {
            state.apply(envelope);
        }

        Self {
            id,
            version,
            state,
            uncommitted: Vec::new(),
        }
    }

    /// Validate `command`, then apply and record whatever it emits.
    ///
    /// On error nothing changes. Events are applied immediately so that later
    /// commands in the same session see the new state.
    pub fn execute(&mut self, command: &A::Command, actor_id: Option<Uuid>) -> Result<usize, A::Error> {
        let events = self.state.handle_command(command)?;
        let emitted = events.len();

        for event in events {
            let sequence = self.version + self.uncommitted.len() as i64 + 1;
            let envelope = EventEnvelope::new(self.id, sequence, event).with_actor(actor_id);
            self.state.apply(&envelope);
            self.uncommitted.push(envelope);
        }

        Ok(emitted)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Last version known to be persisted.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn uncommitted_events(&self) -> &[EventEnvelope<A::Event>] {
        &self.uncommitted
    }

    pub fn has_uncommitted_events(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Called once the store has accepted the uncommitted events.
    pub fn mark_committed(&mut self, new_version: i64) {
        self.version = new_version;
        self.uncommitted.clear();
    }

    /// Drop uncommitted events without touching the version.
    pub fn clear_uncommitted(&mut self) {
        self.uncommitted.clear();
    }
}
