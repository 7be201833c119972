use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::errors::EventStoreError;
use super::log::{EventLog, NewEvent, StoredEvent};

/// In-memory event log.
///
/// The write lock is held across the version check and the insert, which
/// gives the same guarantee as a unique `(aggregate_id, version)` index inside
/// a transaction, but only within one process. Intended for tests and the
/// demo binary.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream_version(stream: &[StoredEvent]) -> i64 {
        stream.last().map(|e| e.version).unwrap_or(0)
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
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

        let mut streams = self.streams.write().await;
        let existing = streams.get(&aggregate_id).map(Vec::as_slice).unwrap_or_default();

        if let Some(first) = existing.first() {
            if first.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch {
                    aggregate_id,
                    stored: first.aggregate_type.clone(),
                    requested: aggregate_type.to_string(),
                });
            }
        }

        let current = Self::stream_version(existing);
        if current != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current,
            });
        }

        // Nothing below can fail, so the batch lands whole or not at all.
        let stream = streams.entry(aggregate_id).or_default();
        let mut version = current;
        for event in events {
            version += 1;
            stream.push(StoredEvent::from_new(aggregate_id, aggregate_type, version, event));
        }

        Ok(version)
    }

    async fn load(&self, aggregate_id: Uuid, from_version: i64) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().await;

        Ok(streams
            .get(&aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.version > from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_id)
            .map(|stream| Self::stream_version(stream))
            .unwrap_or(0))
    }

    async fn load_by_aggregate_type(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().await;

        let mut records: Vec<StoredEvent> = streams
            .values()
            .flatten()
            .filter(|e| e.aggregate_type == aggregate_type)
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.aggregate_id.cmp(&b.aggregate_id))
                .then_with(|| a.version.cmp(&b.version))
        });

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn new_event(event_type: &str) -> NewEvent {
        NewEvent {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            payload: "{}".to_string(),
            metadata: "{}".to_string(),
            occurred_at: Utc::now(),
            actor_id: None,
        }
    }

    #[tokio::test]
    async fn test_empty_log_reports_version_zero() {
        let log = InMemoryEventLog::new();
        let id = Uuid::new_v4();

        assert_eq!(log.current_version(id).await.unwrap(), 0);
        assert!(log.load(id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_assigns_gapless_versions() {
        let log = InMemoryEventLog::new();
        let id = Uuid::new_v4();

        let v = log.append(id, "Thing", vec![new_event("A"), new_event("B")], 0).await.unwrap();
        assert_eq!(v, 2);
        let v = log.append(id, "Thing", vec![new_event("C")], 2).await.unwrap();
        assert_eq!(v, 3);

        let versions: Vec<i64> = log.load(id, 0).await.unwrap().iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);

        let tail: Vec<String> = log.load(id, 1).await.unwrap().into_iter().map(|e| e.event_type).collect();
        assert_eq!(tail, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_stale_expected_version_is_rejected() {
        let log = InMemoryEventLog::new();
        let id = Uuid::new_v4();
        log.append(id, "Thing", vec![new_event("A")], 0).await.unwrap();

        let err = log.append(id, "Thing", vec![new_event("B")], 0).await.unwrap_err();
        assert!(matches!(
            err,
            EventStoreError::ConcurrencyConflict { expected: 0, actual: 1, .. }
        ));
        assert_eq!(log.current_version(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_append_on_unknown_id_leaves_no_stream() {
        let log = InMemoryEventLog::new();

        for _ in 0..3 {
            let err = log.append(Uuid::new_v4(), "Thing", vec![new_event("A")], 5).await.unwrap_err();
            assert!(err.is_conflict());
        }

        assert!(log.streams.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_under_another_aggregate_type_is_rejected() {
        let log = InMemoryEventLog::new();
        let id = Uuid::new_v4();
        log.append(id, "User", vec![new_event("UserCreated")], 0).await.unwrap();

        let err = log.append(id, "Account", vec![new_event("AccountCreated")], 1).await.unwrap_err();
        assert!(matches!(
            &err,
            EventStoreError::AggregateTypeMismatch { stored, requested, .. }
                if stored == "User" && requested == "Account"
        ));
        assert!(!err.is_conflict());

        let kinds: Vec<String> = log.load(id, 0).await.unwrap().into_iter().map(|e| e.aggregate_type).collect();
        assert_eq!(kinds, vec!["User".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_append_skips_version_check() {
        let log = InMemoryEventLog::new();
        let id = Uuid::new_v4();

        assert_eq!(log.append(id, "Thing", vec![], 42).await.unwrap(), 42);
        assert_eq!(log.current_version(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_racing_appends_have_one_winner() {
        let log = Arc::new(InMemoryEventLog::new());
        let id = Uuid::new_v4();
        log.append(id, "Thing", vec![new_event("A"), new_event("B")], 0).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append(id, "Thing", vec![new_event("C")], 2).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(version) => {
                    assert_eq!(version, 3);
                    winners += 1;
                }
                Err(err) => assert!(err.is_conflict()),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(log.load(id, 0).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_load_by_aggregate_type_filters_and_orders() {
        let log = InMemoryEventLog::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let base = Utc::now();

        let mut early = new_event("Early");
        early.occurred_at = base;
        let mut late = new_event("Late");
        late.occurred_at = base + chrono::Duration::seconds(5);

        log.append(second, "Thing", vec![late], 0).await.unwrap();
        log.append(first, "Thing", vec![early], 0).await.unwrap();
        log.append(Uuid::new_v4(), "Other", vec![new_event("X")], 0).await.unwrap();

        let records = log.load_by_aggregate_type("Thing").await.unwrap();
        let kinds: Vec<&str> = records.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, vec!["Early", "Late"]);
    }
}
