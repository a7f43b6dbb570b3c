//! Dispatcher - resolves, normalizes and fans out each reading

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use contracts::{
    LoggerBlueprint, Publication, PublishContext, Reading, Sink, TagValue, ValueKind,
};

use crate::error::DispatcherError;
use crate::handle::SinkWorker;
use crate::metrics::{
    record_delivery, record_reading, DeliveryStatus, ReadingStatus, SinkMetrics,
};
use crate::normalize::normalize;
use crate::registry::TagRegistry;
use crate::sinks::{BroadcastHub, BroadcastSink, DocumentStoreSink, HttpPushSink, MetricsSink};

/// Per-reading result of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub kind: ValueKind,
    /// Sinks that accepted the reading
    pub delivered: usize,
    /// Numeric-only sinks passed over for a non-numeric kind
    pub skipped: usize,
    /// Sinks whose `deliver` returned an error
    pub failed: usize,
}

/// Fans readings out to the active sinks
///
/// Everything it holds is fixed at construction; `publish` takes `&self`
/// and may be called from several tasks at once.
pub struct Dispatcher {
    registry: Arc<TagRegistry>,
    context: Arc<PublishContext>,
    sinks: Vec<Arc<dyn Sink>>,
}

impl Dispatcher {
    /// Dispatch to exactly `sinks`, in order
    pub fn new(
        registry: Arc<TagRegistry>,
        context: Arc<PublishContext>,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Self {
        Self {
            registry,
            context,
            sinks,
        }
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn context(&self) -> &PublishContext {
        &self.context
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Publish one reading; failures are logged, never returned
    pub fn publish(&self, tag_id: &str, value: &TagValue, timestamp: DateTime<Utc>) {
        if let Err(e) = self.try_publish(tag_id, value, timestamp) {
            warn!(tag_id, error = %e, "Reading not dispatched");
        }
    }

    pub fn publish_reading(&self, reading: &Reading) {
        self.publish(&reading.tag_id, &reading.value, reading.timestamp);
    }

    /// Publish one reading and report what happened
    ///
    /// # Errors
    /// `TagNotFound` when the tag is not registered; no sink is invoked.
    /// Sink failures are not errors here, they are counted in the summary.
    pub fn try_publish(
        &self,
        tag_id: &str,
        value: &TagValue,
        timestamp: DateTime<Utc>,
    ) -> Result<DispatchSummary, DispatcherError> {
        let metadata = match self.registry.lookup(tag_id) {
            Ok(metadata) => metadata,
            Err(e) => {
                record_reading(ReadingStatus::UnknownTag);
                return Err(e);
            }
        };

        let normalized = normalize(value);
        let publication = Publication {
            metadata,
            value,
            timestamp,
            normalized,
            context: &self.context,
        };

        let mut summary = DispatchSummary {
            kind: normalized.kind,
            delivered: 0,
            skipped: 0,
            failed: 0,
        };

        for sink in &self.sinks {
            if sink.numeric_only() && normalized.numeric.is_none() {
                summary.skipped += 1;
                record_delivery(sink.name(), DeliveryStatus::Skipped);
                continue;
            }

            match sink.deliver(&publication) {
                Ok(()) => {
                    summary.delivered += 1;
                    record_delivery(sink.name(), DeliveryStatus::Delivered);
                }
                Err(e) => {
                    summary.failed += 1;
                    record_delivery(sink.name(), DeliveryStatus::Failed);
                    warn!(sink = sink.name(), tag_id, error = %e, "Sink delivery failed");
                }
            }
        }

        record_reading(ReadingStatus::Dispatched);
        debug!(
            tag_id,
            kind = %summary.kind,
            delivered = summary.delivered,
            skipped = summary.skipped,
            failed = summary.failed,
            "Reading dispatched"
        );
        Ok(summary)
    }
}

/// Everything built from a blueprint: the dispatcher plus the background
/// pieces the caller has to serve or shut down
pub struct Exporters {
    pub dispatcher: Dispatcher,
    /// Present when the broadcast sink is enabled; serve it with
    /// `serve_websockets`
    pub broadcast_hub: Option<BroadcastHub>,
    pub workers: Vec<SinkWorker>,
    /// Queue counters of the queued sinks, by sink name
    pub queues: Vec<(String, Arc<SinkMetrics>)>,
}

impl Exporters {
    /// Drop the dispatcher and wait for queued sinks to drain
    #[instrument(name = "exporters_shutdown", skip(self), fields(workers = self.workers.len()))]
    pub async fn shutdown(self) {
        drop(self.dispatcher);
        for worker in self.workers {
            worker.join().await;
        }
        info!("Exporters shut down");
    }
}

/// Builds a Dispatcher with one sink per enabled exporter
pub struct DispatcherBuilder<'a> {
    blueprint: &'a LoggerBlueprint,
}

impl<'a> DispatcherBuilder<'a> {
    pub fn new(blueprint: &'a LoggerBlueprint) -> Self {
        Self { blueprint }
    }

    /// Build the registry and start the enabled sinks
    ///
    /// Must be called from within a tokio runtime (queued sinks spawn their
    /// workers here).
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(logger = %self.blueprint.logger.name)
    )]
    pub async fn build(self) -> Result<Exporters, DispatcherError> {
        let registry = Arc::new(TagRegistry::from_tags(self.blueprint.tags.iter().cloned())?);
        let context = Arc::new(self.blueprint.publish_context());
        let enabled = self.blueprint.enabled_sinks();
        let exporters = &self.blueprint.exporters;

        // Checked before anything is spawned; tokio channels panic on zero
        if enabled.http {
            require_capacity("http", exporters.http.queue_capacity)?;
        }
        if enabled.broadcast {
            require_capacity("broadcast", exporters.broadcast.channel_capacity)?;
        }
        if enabled.document_store {
            require_capacity("document_store", exporters.document_store.queue_capacity)?;
        }

        let mut sinks: Vec<Arc<dyn Sink>> = Vec::with_capacity(enabled.count());
        let mut workers = Vec::new();
        let mut queues = Vec::new();
        let mut broadcast_hub = None;

        if enabled.metrics {
            sinks.push(Arc::new(MetricsSink::new(&context.namespace)));
        }

        if enabled.http {
            let (sink, worker) = HttpPushSink::spawn(&exporters.http)
                .map_err(|e| DispatcherError::sink_creation("http", e.to_string()))?;
            queues.push((sink.name().to_string(), Arc::clone(sink.handle().metrics())));
            sinks.push(Arc::new(sink));
            workers.push(worker);
        }

        if enabled.broadcast {
            let hub = BroadcastHub::new(exporters.broadcast.channel_capacity);
            sinks.push(Arc::new(BroadcastSink::new(hub.clone())));
            broadcast_hub = Some(hub);
        }

        if enabled.document_store {
            let (sink, worker) =
                DocumentStoreSink::spawn(&exporters.document_store, &context.namespace)
                    .await
                    .map_err(|e| DispatcherError::sink_creation("document_store", e.to_string()))?;
            queues.push((sink.name().to_string(), Arc::clone(sink.handle().metrics())));
            sinks.push(Arc::new(sink));
            workers.push(worker);
        }

        info!(
            tags = registry.len(),
            namespace = %context.namespace,
            sinks = sinks.len(),
            "Dispatcher ready"
        );

        Ok(Exporters {
            dispatcher: Dispatcher::new(registry, context, sinks),
            broadcast_hub,
            workers,
            queues,
        })
    }
}

fn require_capacity(sink: &str, capacity: usize) -> Result<(), DispatcherError> {
    if capacity == 0 {
        return Err(DispatcherError::sink_creation(
            sink,
            "queue capacity must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::{ContractError, MetricKind, TagMetadata};
    use std::sync::Mutex;

    /// What a recording sink saw for one delivery
    #[derive(Debug, Clone, PartialEq)]
    struct Seen {
        tag_id: String,
        display_name: String,
        value: TagValue,
        timestamp: DateTime<Utc>,
        kind: ValueKind,
        numeric: Option<f64>,
        source_name: String,
    }

    struct RecordingSink {
        name: String,
        numeric_only: bool,
        fail: bool,
        seen: Mutex<Vec<Seen>>,
    }

    impl RecordingSink {
        fn new(name: &str) -> Arc<Self> {
            Self::build(name, false, false)
        }

        fn numeric(name: &str) -> Arc<Self> {
            Self::build(name, true, false)
        }

        fn failing(name: &str) -> Arc<Self> {
            Self::build(name, false, true)
        }

        fn build(name: &str, numeric_only: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                numeric_only,
                fail,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn numeric_only(&self) -> bool {
            self.numeric_only
        }

        fn deliver(&self, p: &Publication<'_>) -> Result<(), ContractError> {
            self.seen.lock().unwrap().push(Seen {
                tag_id: p.metadata.tag_id.to_string(),
                display_name: p.metadata.display_name.clone(),
                value: p.value.clone(),
                timestamp: p.timestamp,
                kind: p.normalized.kind,
                numeric: p.normalized.numeric,
                source_name: p.context.source_name.clone(),
            });
            if self.fail {
                Err(ContractError::sink_write(&self.name, "injected failure"))
            } else {
                Ok(())
            }
        }
    }

    fn registry() -> Arc<TagRegistry> {
        Arc::new(
            TagRegistry::from_tags([
                TagMetadata::new("T1", "Temp", MetricKind::Gauge),
                TagMetadata::new("T2", "Running", MetricKind::Gauge),
            ])
            .unwrap(),
        )
    }

    fn context() -> Arc<PublishContext> {
        Arc::new(PublishContext::new("Press Line", "opc.tcp://plc:4840"))
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn dispatcher(sinks: &[Arc<RecordingSink>]) -> Dispatcher {
        let sinks = sinks
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn Sink>)
            .collect();
        Dispatcher::new(registry(), context(), sinks)
    }

    #[test]
    fn test_float_reaches_every_sink() {
        let metrics = RecordingSink::numeric("metrics");
        let http = RecordingSink::new("http");
        let broadcast = RecordingSink::new("broadcast");
        let store = RecordingSink::new("document_store");
        let all = [metrics.clone(), http.clone(), broadcast.clone(), store.clone()];
        let d = dispatcher(&all);

        let summary = d.try_publish("T1", &TagValue::Float64(23.5), ts()).unwrap();

        assert_eq!(summary.delivered, 4);
        assert_eq!(summary.kind, ValueKind::Float64);
        for sink in &all {
            let seen = sink.seen();
            assert_eq!(seen.len(), 1, "{}", sink.name);
            assert_eq!(seen[0].tag_id, "T1");
            assert_eq!(seen[0].display_name, "Temp");
            assert_eq!(seen[0].value, TagValue::Float64(23.5));
            assert_eq!(seen[0].timestamp, ts());
            assert_eq!(seen[0].kind, ValueKind::Float64);
            assert_eq!(seen[0].source_name, "Press Line");
        }
        assert_eq!(metrics.seen()[0].numeric, Some(23.5));
    }

    #[test]
    fn test_bool_skips_numeric_only_sink() {
        let metrics = RecordingSink::numeric("metrics");
        let http = RecordingSink::new("http");
        let d = dispatcher(&[metrics.clone(), http.clone()]);

        let summary = d.try_publish("T2", &TagValue::Bool(true), ts()).unwrap();

        assert!(metrics.seen().is_empty());
        assert_eq!(http.seen().len(), 1);
        assert_eq!(http.seen()[0].kind, ValueKind::Bool);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_string_skips_numeric_only_sink() {
        let metrics = RecordingSink::numeric("metrics");
        let d = dispatcher(&[metrics.clone()]);

        d.try_publish("T1", &TagValue::String("n/a".into()), ts())
            .unwrap();

        assert!(metrics.seen().is_empty());
    }

    #[test]
    fn test_unknown_tag_invokes_nothing() {
        let metrics = RecordingSink::numeric("metrics");
        let http = RecordingSink::new("http");
        let d = dispatcher(&[metrics.clone(), http.clone()]);

        let err = d.try_publish("T3", &TagValue::Int(1), ts()).unwrap_err();

        assert!(matches!(err, DispatcherError::TagNotFound { ref tag_id } if tag_id == "T3"));
        assert!(metrics.seen().is_empty());
        assert!(http.seen().is_empty());

        // The non-reporting form swallows the error
        d.publish("T3", &TagValue::Int(1), ts());
        assert!(http.seen().is_empty());
    }

    #[test]
    fn test_failing_sink_does_not_stop_later_sinks() {
        let first = RecordingSink::failing("http");
        let second = RecordingSink::new("broadcast");
        let third = RecordingSink::numeric("metrics");
        let d = dispatcher(&[first.clone(), second.clone(), third.clone()]);

        let summary = d.try_publish("T1", &TagValue::Int16(-4), ts()).unwrap();

        assert_eq!(first.seen().len(), 1);
        assert_eq!(second.seen().len(), 1);
        assert_eq!(third.seen().len(), 1);
        assert_eq!(third.seen()[0].numeric, Some(-4.0));
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.delivered, 2);
    }

    #[test]
    fn test_no_sinks_is_valid() {
        let d = dispatcher(&[]);
        let summary = d.try_publish("T1", &TagValue::UInt8(7), ts()).unwrap();
        assert_eq!(summary.delivered + summary.skipped + summary.failed, 0);
    }

    #[test]
    fn test_publish_reading() {
        let http = RecordingSink::new("http");
        let d = dispatcher(&[http.clone()]);

        d.publish_reading(&Reading::new("T2", false, ts()));

        assert_eq!(http.seen()[0].value, TagValue::Bool(false));
    }

    #[test]
    fn test_concurrent_publish() {
        let http = RecordingSink::new("http");
        let d = Arc::new(dispatcher(&[http.clone()]));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let d = Arc::clone(&d);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        d.publish("T1", &TagValue::Int(i * 100 + j), ts());
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(http.seen().len(), 100);
    }

    fn blueprint(json: &str) -> LoggerBlueprint {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_builder_instantiates_enabled_sinks_only() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(&format!(
            r#"{{
                "logger": {{ "name": "Press Line" }},
                "source": {{ "url": "opc.tcp://plc:4840" }},
                "tags": [{{ "tag_id": "T1", "display_name": "Temp" }}],
                "exporters": {{
                    "broadcast": {{ "enabled": true }},
                    "document_store": {{ "enabled": true, "base_path": {:?} }}
                }}
            }}"#,
            dir.path().to_str().unwrap()
        ));

        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();

        assert_eq!(
            exporters.dispatcher.sink_names(),
            vec!["broadcast", "document_store"]
        );
        assert!(exporters.broadcast_hub.is_some());
        assert_eq!(exporters.workers.len(), 1);
        assert_eq!(exporters.queues.len(), 1);
        assert_eq!(exporters.queues[0].0, "document_store");
        assert_eq!(exporters.dispatcher.context().namespace, "PressLine");

        exporters
            .dispatcher
            .publish("T1", &TagValue::Float32(1.5), ts());
        let queue = Arc::clone(&exporters.queues[0].1);

        exporters.shutdown().await;
        assert_eq!(queue.snapshot().write_count, 1);
    }

    #[tokio::test]
    async fn test_builder_rejects_zero_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            r#""broadcast": { "enabled": true, "channel_capacity": 0 }"#.to_string(),
            r#""http": { "enabled": true, "url": "http://127.0.0.1:9/ingest", "queue_capacity": 0 }"#
                .to_string(),
            format!(
                r#""document_store": {{ "enabled": true, "base_path": {:?}, "queue_capacity": 0 }}"#,
                dir.path().to_str().unwrap()
            ),
        ];

        for (exporter, expected) in cases.iter().zip(["broadcast", "http", "document_store"]) {
            let bp = blueprint(&format!(
                r#"{{
                    "logger": {{ "name": "Press Line" }},
                    "source": {{ "url": "opc.tcp://plc:4840" }},
                    "tags": [{{ "tag_id": "T1", "display_name": "Temp" }}],
                    "exporters": {{ {exporter} }}
                }}"#
            ));

            let err = DispatcherBuilder::new(&bp).build().await.err().unwrap();
            assert!(
                matches!(err, DispatcherError::SinkCreation { ref name, .. } if name == expected),
                "{err}"
            );
        }
    }

    #[tokio::test]
    async fn test_builder_all_sinks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(&format!(
            r#"{{
                "logger": {{ "name": "L" }},
                "source": {{ "url": "opc.tcp://plc:4840" }},
                "tags": [{{ "tag_id": "T1", "display_name": "Temp" }}],
                "exporters": {{
                    "metrics": {{ "enabled": true }},
                    "http": {{ "enabled": true, "url": "http://127.0.0.1:9/ingest" }},
                    "broadcast": {{ "enabled": true }},
                    "document_store": {{ "enabled": true, "base_path": {:?} }}
                }}
            }}"#,
            dir.path().to_str().unwrap()
        ));

        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();
        assert_eq!(
            exporters.dispatcher.sink_names(),
            vec!["metrics", "http", "broadcast", "document_store"]
        );
        exporters.shutdown().await;
    }
}
