use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::event::{AggregateEvent, DomainEvent};

// ============================================================================
// Event Registry - kind name <-> payload schema
// ============================================================================
//
// Built once at startup, then shared (usually behind an Arc) by the store
// and the command handlers. There is no global instance.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    #[error("Failed to decode event of kind {kind}: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// `kind` is registered, but to a different payload schema, so the
    /// encoded bytes could never be decoded back.
    #[error("Event kind {kind} is registered to schema {registered}")]
    SchemaMismatch {
        kind: String,
        registered: &'static str,
    },

    #[error("Failed to encode event of kind {kind}: {source}")]
    Encode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Transport-neutral form of one event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedEvent {
    pub event_type: String,
    pub payload: String,
}

type Decoder<E> = Arc<dyn Fn(&str) -> Result<E, serde_json::Error> + Send + Sync>;

struct Registration<E> {
    /// `event_type()` of the payload struct registered under this kind.
    schema: &'static str,
    decoder: Decoder<E>,
}

/// Maps kind names to the concrete payload type of one aggregate's event family.
pub struct EventRegistry<E> {
    decoders: HashMap<String, Registration<E>>,
}

impl<E: AggregateEvent> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `T` under its own `event_type()` name.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: DomainEvent + Into<E>,
    {
        self.register_as::<T>(T::event_type())
    }

    /// Register `T` under an explicit kind name. The last registration for a
    /// name replaces any earlier one.
    ///
    /// A name other than `T::event_type()` is a decode-only alias: events are
    /// always encoded under their own kind.
    pub fn register_as<T>(&mut self, kind: &str) -> &mut Self
    where
        T: DomainEvent + Into<E>,
    {
        let decoder: Decoder<E> =
            Arc::new(|payload: &str| serde_json::from_str::<T>(payload).map(Into::into));

        let registration = Registration {
            schema: T::event_type(),
            decoder,
        };
        if self.decoders.insert(kind.to_string(), registration).is_some() {
            tracing::debug!(event_type = kind, "Replaced existing event registration");
        }
        self
    }

    pub fn encode(&self, event: &E) -> Result<EncodedEvent, RegistryError> {
        let kind = event.event_type();
        let registration = self
            .decoders
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))?;

        if registration.schema != kind {
            return Err(RegistryError::SchemaMismatch {
                kind: kind.to_string(),
                registered: registration.schema,
            });
        }

        let payload = serde_json::to_string(event).map_err(|source| RegistryError::Encode {
            kind: kind.to_string(),
            source,
        })?;

        Ok(EncodedEvent {
            event_type: kind.to_string(),
            payload,
        })
    }

    pub fn decode(&self, kind: &str, payload: &str) -> Result<E, RegistryError> {
        let registration = self
            .decoders
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))?;

        (registration.decoder)(payload).map_err(|source| RegistryError::Decode {
            kind: kind.to_string(),
            source,
        })
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn registered_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl<E: AggregateEvent> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.decoders.keys().collect();
        kinds.sort();
        f.debug_struct("EventRegistry").field("kinds", &kinds).finish()
    }
}
