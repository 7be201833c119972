use std::sync::Arc;

use uuid::Uuid;

use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

use super::core::{Aggregate, AggregateRoot};
use super::store::{EventStore, EventStoreError};

// ============================================================================
// Generic Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → Event Store
//
// Every call replays the aggregate from the store, so a handler holds no
// per-aggregate state and can be shared freely.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CommandError<E: std::error::Error + 'static> {
    /// The aggregate rejected the command. Nothing was persisted.
    #[error("Command rejected: {0}")]
    Validation(#[source] E),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl<E: std::error::Error + 'static> CommandError<E> {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommandError::Store(err) if err.is_conflict())
    }

    pub fn validation(&self) -> Option<&E> {
        match self {
            CommandError::Validation(err) => Some(err),
            CommandError::Store(_) => None,
        }
    }
}

impl<E: std::error::Error + 'static> IsTransient for CommandError<E> {
    fn is_transient(&self) -> bool {
        self.is_conflict()
    }
}

pub struct CommandHandler<A: Aggregate> {
    event_store: Arc<EventStore<A::Event>>,
}

impl<A: Aggregate> CommandHandler<A> {
    pub fn new(event_store: Arc<EventStore<A::Event>>) -> Self {
        Self { event_store }
    }

    pub fn event_store(&self) -> &EventStore<A::Event> {
        &self.event_store
    }

    /// Current state of `aggregate_id`, or `None` if it was never written.
    pub async fn load(&self, aggregate_id: Uuid) -> Result<Option<AggregateRoot<A>>, EventStoreError> {
        self.event_store.load_aggregate::<A>(aggregate_id).await
    }

    /// Handle a command and persist resulting events.
    /// Returns the aggregate version after the command.
    ///
    /// A command that emits nothing returns the current version and writes
    /// nothing.
    pub async fn handle(
        &self,
        aggregate_id: Uuid,
        command: &A::Command,
        actor_id: Option<Uuid>,
    ) -> Result<i64, CommandError<A::Error>> {
        let mut root = match self.load(aggregate_id).await? {
            Some(root) => root,
            None => AggregateRoot::new(aggregate_id),
        };

        let emitted = root
            .execute(command, actor_id)
            .map_err(CommandError::Validation)?;

        if emitted == 0 {
            tracing::debug!(
                aggregate_id = %aggregate_id,
                aggregate_type = A::aggregate_type(),
                version = root.version(),
                "Command produced no events"
            );
            return Ok(root.version());
        }

        let new_version = self.event_store.save(&mut root).await?;
        Ok(new_version)
    }

    /// Like `handle`, but reloads and re-runs the command when it loses an
    /// optimistic concurrency race. Validation errors are returned at once.
    pub async fn handle_with_retry(
        &self,
        aggregate_id: Uuid,
        command: &A::Command,
        actor_id: Option<Uuid>,
        retry: RetryConfig,
    ) -> Result<i64, CommandError<A::Error>> {
        retry_on_transient(retry, |_attempt| self.handle(aggregate_id, command, actor_id))
            .await
            .into_result()
    }
}
