//! Publication - what the dispatcher hands to each sink

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::{NormalizedReading, TagId, TagMetadata, TagValue, ValueKind};

/// Process-wide identity of this logger, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishContext {
    /// Configured logger name
    pub source_name: String,
    /// Endpoint URL of the monitored server
    pub source_url: String,
    /// Logger name with all spaces removed; scopes metrics and documents
    pub namespace: String,
}

impl PublishContext {
    pub fn new(source_name: impl Into<String>, source_url: impl Into<String>) -> Self {
        let source_name = source_name.into();
        let namespace = namespace_for(&source_name);
        Self {
            source_name,
            source_url: source_url.into(),
            namespace,
        }
    }
}

/// Namespace derived from a logger name
pub fn namespace_for(logger_name: &str) -> String {
    logger_name.replace(' ', "")
}

/// One resolved, normalized reading on its way to the sinks
///
/// Borrowed from the dispatcher for the duration of a single `deliver` call.
/// Sinks that need to keep data past the call copy it out via `to_record`.
#[derive(Debug, Clone, Copy)]
pub struct Publication<'a> {
    pub metadata: &'a TagMetadata,
    pub value: &'a TagValue,
    pub timestamp: DateTime<Utc>,
    pub normalized: NormalizedReading,
    pub context: &'a PublishContext,
}

impl Publication<'_> {
    pub fn tag_id(&self) -> &TagId {
        &self.metadata.tag_id
    }

    pub fn kind(&self) -> ValueKind {
        self.normalized.kind
    }

    /// Owned payload shared by the push, broadcast and document sinks
    pub fn to_record(&self) -> TelemetryRecord {
        TelemetryRecord {
            tag_id: self.metadata.tag_id.clone(),
            display_name: self.metadata.display_name.clone(),
            value: self.value.clone(),
            timestamp: self.timestamp,
            source_name: self.context.source_name.clone(),
            source_url: self.context.source_url.clone(),
            kind: self.normalized.kind,
            namespace: None,
        }
    }
}

/// Wire form of a publication
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub tag_id: TagId,
    pub display_name: String,
    pub value: TagValue,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub source_name: String,
    pub source_url: String,
    pub kind: ValueKind,
    /// Set only for persisted documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl TelemetryRecord {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

fn serialize_rfc3339<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
