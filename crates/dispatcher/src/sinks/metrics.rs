//! MetricsSink - feeds numeric samples into the process metrics recorder
//!
//! The recorder (Prometheus, installed by `observability`) owns the shared
//! registry and serves the scrape endpoint; this sink only updates values.

use contracts::{ContractError, MetricKind, Publication, Sink, TagId};
use metrics::gauge;
use tracing::trace;

/// Sink that exports each tag as a labelled sample
pub struct MetricsSink {
    name: String,
    gauge_name: String,
    counter_name: String,
}

impl MetricsSink {
    /// Metric names are scoped by `namespace`:
    /// `{namespace}_tag_value` for gauges and `{namespace}_tag_total` for counters.
    pub fn new(namespace: &str) -> Self {
        let prefix = metric_prefix(namespace);
        Self {
            name: "metrics".to_string(),
            gauge_name: format!("{prefix}_tag_value"),
            counter_name: format!("{prefix}_tag_total"),
        }
    }

    pub fn gauge_name(&self) -> &str {
        &self.gauge_name
    }

    pub fn counter_name(&self) -> &str {
        &self.counter_name
    }

    /// Set the current sample for one tag
    ///
    /// Counter tags carry the running total reported by the device, which may
    /// be fractional (energy, flow), so both kinds are exported as f64
    /// samples. Negative or NaN totals clamp to zero.
    pub fn record(&self, metric_kind: MetricKind, tag_id: &TagId, display_name: &str, value: f64) {
        let labels = [
            ("tag_id", tag_id.to_string()),
            ("display_name", display_name.to_string()),
        ];

        match metric_kind {
            MetricKind::Gauge => gauge!(self.gauge_name.clone(), &labels).set(value),
            MetricKind::Counter => {
                gauge!(self.counter_name.clone(), &labels).set(value.max(0.0))
            }
        }

        trace!(tag_id = %tag_id, ?metric_kind, value, "metric recorded");
    }
}

impl Sink for MetricsSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn numeric_only(&self) -> bool {
        true
    }

    fn deliver(&self, publication: &Publication<'_>) -> Result<(), ContractError> {
        let value = publication.normalized.numeric.ok_or_else(|| {
            ContractError::sink_write(
                &self.name,
                format!("kind '{}' has no numeric sample", publication.kind()),
            )
        })?;

        let meta = publication.metadata;
        self.record(meta.metric_kind, &meta.tag_id, &meta.display_name, value);
        Ok(())
    }
}

/// Prometheus metric names allow `[a-zA-Z0-9_:]` and must not start with a digit
fn metric_prefix(namespace: &str) -> String {
    let mut prefix: String = namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if prefix.is_empty() || prefix.starts_with(|c: char| c.is_ascii_digit()) {
        prefix.insert(0, '_');
    }
    prefix.to_lowercase()
}
