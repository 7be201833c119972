use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, AggregateEvent, AggregateRoot, EventEnvelope, EventRegistry, RegistryError};
use crate::metrics::Metrics;

use super::errors::EventStoreError;
use super::log::{EventLog, NewEvent, StoredEvent, StoredEventMetadata};

// ============================================================================
// Generic Event Store - Repository for Events
// ============================================================================
//
// Typed front of an `EventLog`. Works with ANY aggregate event family.
//
// Type Parameter:
// - `E`: The aggregate's event family (must implement AggregateEvent)
//
// Responsibilities:
// 1. Encode envelopes through the registry before anything is written
// 2. Append with optimistic concurrency (delegated to the log)
// 3. Decode history, skipping records that no longer decode
// 4. Rebuild and save aggregate roots
//
// ============================================================================

/// Why a stored record was left out of a load.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnknownKind,
    MalformedPayload(String),
    MalformedMetadata(String),
}

impl SkipReason {
    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::UnknownKind => "unknown_kind",
            SkipReason::MalformedPayload(_) => "malformed_payload",
            SkipReason::MalformedMetadata(_) => "malformed_metadata",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub aggregate_id: Uuid,
    pub version: i64,
    pub event_id: Uuid,
    pub event_type: String,
    pub reason: SkipReason,
}

/// Decoded history of one aggregate.
#[derive(Debug, Clone)]
pub struct EventStream<E> {
    pub events: Vec<EventEnvelope<E>>,
    pub skipped: Vec<SkippedEvent>,
    /// Highest stored version seen, including skipped records. This is the
    /// version the next append must expect.
    pub last_version: i64,
}

impl<E> EventStream<E> {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.skipped.is_empty()
    }
}

pub struct EventStore<E: AggregateEvent> {
    log: Arc<dyn EventLog>,
    registry: Arc<EventRegistry<E>>,
    metrics: Option<Arc<Metrics>>,
}

impl<E: AggregateEvent> EventStore<E> {
    pub fn new(log: Arc<dyn EventLog>, registry: Arc<EventRegistry<E>>) -> Self {
        Self {
            log,
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &EventRegistry<E> {
        &self.registry
    }

    /// Append events to the event store.
    /// Returns the new version number after appending.
    ///
    /// Every event is encoded before the log is touched, so an unregistered
    /// kind fails the whole batch with nothing written.
    #[tracing::instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn append(
        &self,
        aggregate_id: Uuid,
        aggregate_type: &str,
        events: &[EventEnvelope<E>],
        expected_version: i64,
    ) -> Result<i64, EventStoreError> {
        if events.is_empty() {
            return Ok(expected_version);
        }

        let mut records = Vec::with_capacity(events.len());
        for envelope in events {
            let encoded = self.registry.encode(&envelope.event_data)?;
            let metadata = serde_json::to_string(&StoredEventMetadata::new(envelope.event_version))?;

            records.push(NewEvent {
                event_id: envelope.event_id,
                event_type: encoded.event_type,
                payload: encoded.payload,
                metadata,
                occurred_at: envelope.occurred_at,
                actor_id: envelope.actor_id,
            });
        }

        let started = Instant::now();
        match self.log.append(aggregate_id, aggregate_type, records, expected_version).await {
            Ok(new_version) => {
                tracing::info!(
                    aggregate_id = %aggregate_id,
                    aggregate_type = aggregate_type,
                    event_count = events.len(),
                    new_version = new_version,
                    "✅ Appended events to event store"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_append(aggregate_type, events.len(), started.elapsed().as_secs_f64());
                }
                Ok(new_version)
            }
            Err(err) => {
                if let EventStoreError::ConcurrencyConflict { expected, actual, .. } = &err {
                    tracing::warn!(
                        aggregate_id = %aggregate_id,
                        aggregate_type = aggregate_type,
                        expected = expected,
                        actual = actual,
                        "Concurrency conflict on append"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_conflict(aggregate_type);
                    }
                } else {
                    tracing::error!(
                        aggregate_id = %aggregate_id,
                        aggregate_type = aggregate_type,
                        error = %err,
                        "Failed to append events"
                    );
                }
                Err(err)
            }
        }
    }

    /// Load the history of `aggregate_id` after `from_version` (0 = everything).
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, aggregate_id: Uuid, from_version: i64) -> Result<EventStream<E>, EventStoreError> {
        let records = self.log.load(aggregate_id, from_version).await?;
        Ok(self.decode_records(records, from_version))
    }

    /// Every decodable event of one aggregate type, across all aggregates.
    pub async fn load_by_aggregate_type(&self, aggregate_type: &str) -> Result<EventStream<E>, EventStoreError> {
        let records = self.log.load_by_aggregate_type(aggregate_type).await?;
        Ok(self.decode_records(records, 0))
    }

    pub async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        self.log.current_version(aggregate_id).await
    }

    fn decode_records(&self, records: Vec<StoredEvent>, from_version: i64) -> EventStream<E> {
        let mut stream = EventStream {
            events: Vec::with_capacity(records.len()),
            skipped: Vec::new(),
            last_version: from_version,
        };

        for record in records {
            stream.last_version = stream.last_version.max(record.version);

            match self.decode_record(&record) {
                Ok(envelope) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_loaded(&record.aggregate_type);
                    }
                    stream.events.push(envelope);
                }
                Err(reason) => {
                    tracing::warn!(
                        aggregate_id = %record.aggregate_id,
                        version = record.version,
                        event_id = %record.event_id,
                        event_type = %record.event_type,
                        reason = reason.label(),
                        "Skipping stored event that could not be decoded"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_decode_failure(&record.event_type, reason.label());
                    }
                    stream.skipped.push(SkippedEvent {
                        aggregate_id: record.aggregate_id,
                        version: record.version,
                        event_id: record.event_id,
                        event_type: record.event_type.clone(),
                        reason,
                    });
                }
            }
        }

        stream
    }

    fn decode_record(&self, record: &StoredEvent) -> Result<EventEnvelope<E>, SkipReason> {
        let event_data = self
            .registry
            .decode(&record.event_type, &record.payload)
            .map_err(|err| match err {
                RegistryError::UnknownKind(_) | RegistryError::SchemaMismatch { .. } => SkipReason::UnknownKind,
                RegistryError::Decode { source, .. } | RegistryError::Encode { source, .. } => {
                    SkipReason::MalformedPayload(source.to_string())
                }
            })?;

        let metadata: StoredEventMetadata = serde_json::from_str(&record.metadata)
            .map_err(|err| SkipReason::MalformedMetadata(err.to_string()))?;

        Ok(EventEnvelope {
            event_id: record.event_id,
            aggregate_id: record.aggregate_id,
            sequence_number: record.version,
            event_type: record.event_type.clone(),
            event_version: metadata.schema_version,
            event_data,
            actor_id: record.actor_id,
            occurred_at: record.occurred_at,
        })
    }

    // ========================================================================
    // Aggregate Root helpers
    // ========================================================================

    /// Rebuild an aggregate from its full history. `None` if nothing was ever
    /// stored under `aggregate_id`. Fails if the id belongs to another
    /// aggregate type.
    pub async fn load_aggregate<A>(&self, aggregate_id: Uuid) -> Result<Option<AggregateRoot<A>>, EventStoreError>
    where
        A: Aggregate<Event = E>,
    {
        let records = self.log.load(aggregate_id, 0).await?;
        if let Some(foreign) = records.iter().find(|r| r.aggregate_type != A::aggregate_type()) {
            return Err(EventStoreError::AggregateTypeMismatch {
                aggregate_id,
                stored: foreign.aggregate_type.clone(),
                requested: A::aggregate_type().to_string(),
            });
        }

        let stream = self.decode_records(records, 0);
        if stream.last_version == 0 {
            return Ok(None);
        }

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = A::aggregate_type(),
            version = stream.last_version,
            replayed = stream.events.len(),
            skipped = stream.skipped.len(),
            "Rehydrated aggregate"
        );

        Ok(Some(AggregateRoot::replay_at_version(
            aggregate_id,
            &stream.events,
            stream.last_version,
        )))
    }

    /// Persist the root's uncommitted events and advance its version.
    /// On error the root is left as it was.
    pub async fn save<A>(&self, root: &mut AggregateRoot<A>) -> Result<i64, EventStoreError>
    where
        A: Aggregate<Event = E>,
    {
        let new_version = self
            .append(root.id(), A::aggregate_type(), root.uncommitted_events(), root.version())
            .await?;
        root.mark_committed(new_version);
        Ok(new_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::DomainEvent;
    use crate::event_sourcing::store::InMemoryEventLog;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Tagged {
        label: String,
    }

    impl DomainEvent for Tagged {
        fn event_type() -> &'static str { "Tagged" }
    }

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Untagged {}

    impl DomainEvent for Untagged {
        fn event_type() -> &'static str { "Untagged" }
    }

    #[derive(Serialize, Clone, Debug, PartialEq)]
    #[serde(untagged)]
    enum NoteEvent {
        Tagged(Tagged),
        Untagged(Untagged),
    }

    impl From<Tagged> for NoteEvent {
        fn from(e: Tagged) -> Self { NoteEvent::Tagged(e) }
    }

    impl From<Untagged> for NoteEvent {
        fn from(e: Untagged) -> Self { NoteEvent::Untagged(e) }
    }

    impl AggregateEvent for NoteEvent {
        fn event_type(&self) -> &'static str {
            match self {
                NoteEvent::Tagged(_) => Tagged::event_type(),
                NoteEvent::Untagged(_) => Untagged::event_type(),
            }
        }
    }

    fn tagged(aggregate_id: Uuid, seq: i64, label: &str) -> EventEnvelope<NoteEvent> {
        EventEnvelope::new(aggregate_id, seq, NoteEvent::Tagged(Tagged { label: label.to_string() }))
    }

    fn store_with(log: Arc<InMemoryEventLog>) -> EventStore<NoteEvent> {
        let mut registry = EventRegistry::new();
        registry.register::<Tagged>().register::<Untagged>();
        EventStore::new(log, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_append_and_load_round_trip() {
        let store = store_with(Arc::new(InMemoryEventLog::new()));
        let id = Uuid::new_v4();
        let actor = Uuid::new_v4();

        let events = vec![
            tagged(id, 1, "a").with_actor(Some(actor)),
            EventEnvelope::new(id, 2, NoteEvent::Untagged(Untagged {})),
        ];
        assert_eq!(store.append(id, "Note", &events, 0).await.unwrap(), 2);

        let stream = store.load(id, 0).await.unwrap();
        assert!(stream.skipped.is_empty());
        assert_eq!(stream.last_version, 2);
        assert_eq!(stream.events.len(), 2);
        assert_eq!(stream.events[0].event_id, events[0].event_id);
        assert_eq!(stream.events[0].event_data, events[0].event_data);
        assert_eq!(stream.events[0].actor_id, Some(actor));
        assert_eq!(stream.events[1].sequence_number, 2);
        assert_eq!(stream.events[1].event_type, "Untagged");
        assert_eq!(stream.events[0].occurred_at, events[0].occurred_at);
    }

    #[tokio::test]
    async fn test_unregistered_kind_writes_nothing() {
        let log = Arc::new(InMemoryEventLog::new());
        let mut registry = EventRegistry::new();
        registry.register::<Tagged>();
        let store = EventStore::new(log.clone(), Arc::new(registry));
        let id = Uuid::new_v4();

        let events = vec![
            tagged(id, 1, "ok"),
            EventEnvelope::new(id, 2, NoteEvent::Untagged(Untagged {})),
        ];
        let err = store.append(id, "Note", &events, 0).await.unwrap_err();

        assert!(matches!(err, EventStoreError::Registry(RegistryError::UnknownKind(_))));
        assert_eq!(log.current_version(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped_but_counted() {
        let log = Arc::new(InMemoryEventLog::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let store = store_with(log.clone()).with_metrics(metrics.clone());
        let id = Uuid::new_v4();

        store.append(id, "Note", &[tagged(id, 1, "first")], 0).await.unwrap();

        let metadata = serde_json::to_string(&StoredEventMetadata::new(1)).unwrap();
        let foreign = NewEvent {
            event_id: Uuid::new_v4(),
            event_type: "Retired".to_string(),
            payload: "{}".to_string(),
            metadata: metadata.clone(),
            occurred_at: Utc::now(),
            actor_id: None,
        };
        let broken = NewEvent {
            event_id: Uuid::new_v4(),
            event_type: "Tagged".to_string(),
            payload: r#"{"label":5}"#.to_string(),
            metadata,
            occurred_at: Utc::now(),
            actor_id: None,
        };
        log.append(id, "Note", vec![foreign, broken], 1).await.unwrap();

        let stream = store.load(id, 0).await.unwrap();
        assert_eq!(stream.events.len(), 1);
        assert_eq!(stream.last_version, 3);
        assert_eq!(stream.skipped.len(), 2);
        assert_eq!(stream.skipped[0].reason, SkipReason::UnknownKind);
        assert_eq!(stream.skipped[0].version, 2);
        assert!(matches!(stream.skipped[1].reason, SkipReason::MalformedPayload(_)));

        let text = metrics.render().unwrap();
        assert!(text.contains("event_decode_failures_total{event_type=\"Retired\",reason=\"unknown_kind\"} 1"));

        // The next append must expect the highest stored version.
        assert_eq!(store.append(id, "Note", &[tagged(id, 4, "next")], stream.last_version).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_conflict_is_reported_and_counted() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let store = store_with(Arc::new(InMemoryEventLog::new())).with_metrics(metrics.clone());
        let id = Uuid::new_v4();

        store.append(id, "Note", &[tagged(id, 1, "a")], 0).await.unwrap();
        let err = store.append(id, "Note", &[tagged(id, 1, "b")], 0).await.unwrap_err();

        assert!(matches!(err, EventStoreError::ConcurrencyConflict { expected: 0, actual: 1, .. }));
        assert!(metrics.render().unwrap().contains("append_conflicts_total{aggregate_type=\"Note\"} 1"));
    }

    #[tokio::test]
    async fn test_empty_append_is_a_no_op() {
        let store = store_with(Arc::new(InMemoryEventLog::new()));
        let id = Uuid::new_v4();

        assert_eq!(store.append(id, "Note", &[], 7).await.unwrap(), 7);
        assert!(store.load(id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_load_from_version() {
        let store = store_with(Arc::new(InMemoryEventLog::new()));
        let id = Uuid::new_v4();
        let events: Vec<_> = (1..=4).map(|seq| tagged(id, seq, &seq.to_string())).collect();
        store.append(id, "Note", &events, 0).await.unwrap();

        let tail = store.load(id, 2).await.unwrap();
        let seqs: Vec<i64> = tail.events.iter().map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![3, 4]);
        assert_eq!(tail.last_version, 4);

        let nothing = store.load(id, 4).await.unwrap();
        assert!(nothing.is_empty());
        assert_eq!(nothing.last_version, 4);
    }
}
