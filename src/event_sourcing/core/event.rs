use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

// ============================================================================
// Event Envelope - Common Event Fields
// ============================================================================
//
// Every concrete event payload is wrapped in an envelope that carries the
// fields shared by all kinds: identity, occurrence time, actor, kind and
// schema version. Payloads only carry what their own transition needs.
//
// ============================================================================

/// Generic Event Envelope - wraps an aggregate event with its common fields
///
/// Type Parameter:
/// - `E`: The aggregate's event family (must implement `AggregateEvent`)
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EventEnvelope<E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    /// Position in the aggregate stream. Tentative until the store accepts it.
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,
    pub event_version: i32,

    // Event Payload
    pub event_data: E,

    // Actor Information
    pub actor_id: Option<Uuid>,      // Who caused this event

    // Timing (occurrence, not persistence)
    pub occurred_at: DateTime<Utc>,
}

impl<E: AggregateEvent> EventEnvelope<E> {
    pub fn new(aggregate_id: Uuid, sequence_number: i64, event_data: E) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_version: event_data.event_version(),
            event_data,
            actor_id: None,
            occurred_at: Utc::now(),
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn with_actor(mut self, actor_id: Option<Uuid>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

// ============================================================================
// Event Traits
// ============================================================================

/// Implemented by every concrete event payload struct.
///
/// `event_type()` is the persisted discriminant. It must never change once
/// events of that kind have been written, or historical streams stop replaying.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn event_type() -> &'static str where Self: Sized;
    fn event_version() -> i32 where Self: Sized { 1 }
}

/// Implemented by an aggregate's event family (one enum variant per kind).
///
/// Serializing the family must produce exactly the payload of the wrapped
/// concrete event, which is what `#[serde(untagged)]` gives us.
pub trait AggregateEvent: Serialize + Clone + fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;
    fn event_version(&self) -> i32 { 1 }
}

/// Wires an untagged event family enum to its concrete payload structs.
///
/// Generates `From<Payload>` for every variant, the `AggregateEvent` impl
/// (kind and schema version come from each payload's `DomainEvent` impl) and
/// a `registry()` constructor with every kind registered under its own name.
#[macro_export]
macro_rules! event_family {
    ($family:ident { $($variant:ident($payload:ty)),+ $(,)? }) => {
        $(
            impl From<$payload> for $family {
                fn from(event: $payload) -> Self {
                    $family::$variant(event)
                }
            }
        )+

        impl $crate::event_sourcing::core::AggregateEvent for $family {
            fn event_type(&self) -> &'static str {
                match self {
                    $( $family::$variant(_) => <$payload as $crate::event_sourcing::core::DomainEvent>::event_type(), )+
                }
            }

            fn event_version(&self) -> i32 {
                match self {
                    $( $family::$variant(_) => <$payload as $crate::event_sourcing::core::DomainEvent>::event_version(), )+
                }
            }
        }

        impl $family {
            pub fn registry() -> $crate::event_sourcing::core::EventRegistry<$family> {
                let mut registry = $crate::event_sourcing::core::EventRegistry::new();
                $( registry.register::<$payload>(); )+
                registry
            }
        }
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Pinged {
        note: String,
    }

    impl DomainEvent for Pinged {
        fn event_type() -> &'static str { "Pinged" }
        fn event_version() -> i32 { 2 }
    }

    #[derive(Serialize, Clone, Debug, PartialEq)]
    #[serde(untagged)]
    enum PingEvent {
        Pinged(Pinged),
    }

    impl AggregateEvent for PingEvent {
        fn event_type(&self) -> &'static str {
            match self {
                PingEvent::Pinged(_) => Pinged::event_type(),
            }
        }

        fn event_version(&self) -> i32 {
            match self {
                PingEvent::Pinged(_) => Pinged::event_version(),
            }
        }
    }

    #[test]
    fn test_event_envelope_creation() {
        let aggregate_id = Uuid::new_v4();
        let envelope = EventEnvelope::new(
            aggregate_id,
            1,
            PingEvent::Pinged(Pinged { note: "hi".to_string() }),
        );

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.sequence_number, 1);
        assert_eq!(envelope.event_type, "Pinged");
        assert_eq!(envelope.event_version, 2);
        assert!(envelope.actor_id.is_none());
    }

    #[test]
    fn test_envelope_builders() {
        let actor = Uuid::new_v4();
        let at = Utc::now() - chrono::Duration::hours(1);
        let envelope = EventEnvelope::new(
            Uuid::new_v4(),
            3,
            PingEvent::Pinged(Pinged { note: "x".to_string() }),
        )
        .with_actor(Some(actor))
        .with_occurred_at(at);

        assert_eq!(envelope.actor_id, Some(actor));
        assert_eq!(envelope.occurred_at, at);
    }

    #[test]
    fn test_untagged_family_serializes_bare_payload() {
        let event = PingEvent::Pinged(Pinged { note: "bare".to_string() });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"note":"bare"}"#);

        let back: Pinged = serde_json::from_str(&json).unwrap();
        assert_eq!(PingEvent::Pinged(back), event);
    }

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Opened {}

    impl DomainEvent for Opened {
        fn event_type() -> &'static str { "Opened" }
    }

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Shut {
        force: bool,
    }

    impl DomainEvent for Shut {
        fn event_type() -> &'static str { "Shut" }
        fn event_version() -> i32 { 3 }
    }

    #[derive(Serialize, Clone, Debug, PartialEq)]
    #[serde(untagged)]
    enum DoorEvent {
        Opened(Opened),
        Shut(Shut),
    }

    crate::event_family!(DoorEvent {
        Opened(Opened),
        Shut(Shut),
    });

    #[test]
    fn test_event_family_macro() {
        let shut: DoorEvent = Shut { force: true }.into();
        assert_eq!(shut.event_type(), "Shut");
        assert_eq!(shut.event_version(), 3);
        assert_eq!(DoorEvent::from(Opened {}).event_version(), 1);

        let registry = DoorEvent::registry();
        assert_eq!(registry.registered_kinds(), vec!["Opened", "Shut"]);
        assert_eq!(registry.decode("Shut", r#"{"force":true}"#).unwrap(), shut);
    }
}
