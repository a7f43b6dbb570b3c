//! SinkHandle - isolated queue and worker task for sinks doing I/O
//!
//! The dispatcher calls sinks synchronously, so transports that talk to the
//! network or disk enqueue records here and let a spawned worker drive the
//! `RecordWriter`. A full queue drops the record instead of blocking.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, RecordWriter, TelemetryRecord};

use crate::metrics::SinkMetrics;

/// Sending side of a queued sink
#[derive(Debug)]
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<TelemetryRecord>,
    metrics: Arc<SinkMetrics>,
}

/// Running worker; await `join` after every `SinkHandle` is dropped
#[derive(Debug)]
pub struct SinkWorker {
    name: String,
    join: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `writer`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<W>(writer: W, queue_capacity: usize) -> (Self, SinkWorker)
    where
        W: RecordWriter + Send + 'static,
    {
        let name = writer.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let join = tokio::spawn(async move {
            sink_worker(writer, rx, worker_metrics, worker_name).await;
        });

        (
            Self {
                name: name.clone(),
                tx,
                metrics,
            },
            SinkWorker { name, join },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Enqueue a record without waiting
    ///
    /// # Errors
    /// `QueueFull` when the worker is behind, `SinkConnection` when it has
    /// stopped. The record is dropped in both cases.
    pub fn try_send(&self, record: TelemetryRecord) -> Result<(), ContractError> {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(r)) => {
                self.metrics.inc_dropped_count();
                warn!(sink = %self.name, tag_id = %r.tag_id, "Queue full, record dropped");
                Err(ContractError::QueueFull {
                    sink_name: self.name.clone(),
                    tag_id: r.tag_id.to_string(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.inc_dropped_count();
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                Err(ContractError::sink_connection(&self.name, "worker stopped"))
            }
        }
    }
}

impl SinkWorker {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the worker to drain its queue and close the writer
    #[instrument(name = "sink_worker_join", skip(self), fields(sink = %self.name))]
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "Sink worker joined");
    }
}

/// Worker task that consumes records and writes them out
#[instrument(
    name = "sink_worker_loop",
    skip(writer, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<W: RecordWriter>(
    mut writer: W,
    mut rx: mpsc::Receiver<TelemetryRecord>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(record) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match writer.write(&record).await {
            Ok(()) => metrics.inc_write_count(),
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    sink = %name,
                    tag_id = %record.tag_id,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }

    if let Err(e) = writer.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = writer.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::{TagValue, ValueKind};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    struct MockWriter {
        name: String,
        write_count: Arc<AtomicU64>,
        closed: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockWriter {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                write_count: Arc::new(AtomicU64::new(0)),
                closed: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl RecordWriter for MockWriter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _record: &TelemetryRecord) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn record(i: i64) -> TelemetryRecord {
        TelemetryRecord {
            tag_id: "T1".into(),
            display_name: "Temp".into(),
            value: TagValue::Int(i),
            timestamp: Utc::now(),
            source_name: "test".into(),
            source_url: "opc.tcp://localhost:4840".into(),
            kind: ValueKind::Int,
            namespace: None,
        }
    }

    #[tokio::test]
    async fn test_sink_handle_drains_on_shutdown() {
        let writer = MockWriter::new("mock");
        let writes = Arc::clone(&writer.write_count);
        let closed = Arc::clone(&writer.closed);

        let (handle, worker) = SinkHandle::spawn(writer, 10);
        for i in 0..5 {
            assert!(handle.try_send(record(i)).is_ok());
        }

        let metrics = Arc::clone(handle.metrics());
        drop(handle);
        worker.join().await;

        assert_eq!(writes.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.write_count(), 5);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let mut writer = MockWriter::new("slow");
        writer.delay_ms = 100;

        let (handle, worker) = SinkHandle::spawn(writer, 2);

        let results: Vec<_> = (0..10).map(|i| handle.try_send(record(i))).collect();

        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ContractError::QueueFull { .. }))));
        assert!(handle.metrics().dropped_count() > 0);

        drop(handle);
        worker.join().await;
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let mut writer = MockWriter::new("failing");
        writer.should_fail = true;

        let (handle, worker) = SinkHandle::spawn(writer, 10);
        for i in 0..3 {
            assert!(handle.try_send(record(i)).is_ok());
        }

        let metrics = Arc::clone(handle.metrics());
        drop(handle);
        worker.join().await;

        assert_eq!(metrics.failure_count(), 3);
        assert_eq!(metrics.write_count(), 0);
    }
}
