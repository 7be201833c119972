use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the event store
// ============================================================================
//
// Covers:
// - Appends (throughput, latency, concurrency conflicts)
// - Loads (events replayed)
// - Records skipped during replay (unknown kind, malformed payload)
//
// Nothing here serves HTTP. Call `render()` to get the text exposition format
// and hand it to whatever transport the host process uses.
// ============================================================================

/// Central metrics registry for the event store
pub struct Metrics {
    registry: Registry,

    // Append Metrics
    pub events_appended: IntCounterVec,
    pub append_conflicts: IntCounterVec,
    pub append_duration: HistogramVec,

    // Load Metrics
    pub events_loaded: IntCounterVec,
    pub event_decode_failures: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Append Metrics
        let events_appended = IntCounterVec::new(
            Opts::new("events_appended_total", "Total events appended to the store"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let append_conflicts = IntCounterVec::new(
            Opts::new("append_conflicts_total", "Appends rejected by the optimistic version check"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(append_conflicts.clone()))?;

        let append_duration = HistogramVec::new(
            HistogramOpts::new("append_duration_seconds", "Event append duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(append_duration.clone()))?;

        // Load Metrics
        let events_loaded = IntCounterVec::new(
            Opts::new("events_loaded_total", "Total events decoded during loads"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_loaded.clone()))?;

        let event_decode_failures = IntCounterVec::new(
            Opts::new("event_decode_failures_total", "Stored events skipped because they could not be decoded"),
            &["event_type", "reason"],
        )?;
        registry.register(Box::new(event_decode_failures.clone()))?;

        Ok(Self {
            registry,
            events_appended,
            append_conflicts,
            append_duration,
            events_loaded,
            event_decode_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a successful append
    pub fn record_append(&self, aggregate_type: &str, event_count: usize, duration_secs: f64) {
        self.events_appended
            .with_label_values(&[aggregate_type])
            .inc_by(event_count as u64);
        self.append_duration
            .with_label_values(&[aggregate_type])
            .observe(duration_secs);
    }

    /// Helper to record a rejected append
    pub fn record_conflict(&self, aggregate_type: &str) {
        self.append_conflicts.with_label_values(&[aggregate_type]).inc();
    }

    pub fn record_loaded(&self, aggregate_type: &str) {
        self.events_loaded.with_label_values(&[aggregate_type]).inc();
    }

    /// Helper to record a record skipped during replay
    pub fn record_decode_failure(&self, event_type: &str, reason: &str) {
        self.event_decode_failures
            .with_label_values(&[event_type, reason])
            .inc();
    }

    /// Everything gathered so far, in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_loaded("Account");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_append() {
        let metrics = Metrics::new().unwrap();
        metrics.record_append("Account", 2, 0.002);
        metrics.record_append("Account", 1, 0.001);

        let gathered = metrics.registry().gather();
        let appended = gathered.iter().find(|m| m.name() == "events_appended_total").unwrap();
        assert_eq!(appended.metric[0].counter.value, Some(3.0));
    }

    #[test]
    fn test_record_decode_failures_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_decode_failure("AccountRenamed", "unknown_kind");
        metrics.record_decode_failure("TransactionAdded", "malformed_payload");

        let gathered = metrics.registry().gather();
        let failures = gathered.iter().find(|m| m.name() == "event_decode_failures_total").unwrap();
        assert_eq!(failures.metric.len(), 2);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_conflict("User");

        let text = metrics.render().unwrap();
        assert!(text.contains("append_conflicts_total{aggregate_type=\"User\"} 1"));
    }
}
