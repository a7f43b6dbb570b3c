//! Source-side counters

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;

/// Per-source counters, shared between the source and its producer task
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Readings handed to the channel
    pub readings_emitted: AtomicU64,

    /// Lines or values that could not become a reading
    pub parse_errors: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_emitted(&self, source: &str) {
        self.readings_emitted.fetch_add(1, Ordering::Relaxed);
        counter!("tag_logger_source_readings_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_parse_error(&self, source: &str) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        counter!("tag_logger_source_errors_total", "source" => source.to_string()).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            readings_emitted: self.readings_emitted.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub readings_emitted: u64,
    pub parse_errors: u64,
}
