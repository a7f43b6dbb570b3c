//! Tag metadata and readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TagId, TagValue};

/// Metric type a tag is exported as on the scrape endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Gauge,
    Counter,
}

/// Static description of one monitored tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagMetadata {
    pub tag_id: TagId,

    /// Human readable name shown by every sink
    pub display_name: String,

    /// Only consulted by the metrics sink
    #[serde(default)]
    pub metric_kind: MetricKind,
}

impl TagMetadata {
    pub fn new(
        tag_id: impl Into<TagId>,
        display_name: impl Into<String>,
        metric_kind: MetricKind,
    ) -> Self {
        Self {
            tag_id: tag_id.into(),
            display_name: display_name.into(),
            metric_kind,
        }
    }
}

/// One observation produced by the monitoring source
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub tag_id: TagId,
    pub value: TagValue,
    /// Source-assigned observation time
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(tag_id: impl Into<TagId>, value: impl Into<TagValue>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tag_id: tag_id.into(),
            value: value.into(),
            timestamp,
        }
    }
}
