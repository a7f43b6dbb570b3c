//! Sink implementations
//!
//! MetricsSink and BroadcastSink deliver inline; HttpPushSink and
//! DocumentStoreSink enqueue onto a `SinkHandle` worker.

mod broadcast;
mod document;
mod http;
mod metrics;

pub use self::broadcast::{serve_websockets, serve_websockets_on, BroadcastHub, BroadcastSink};
pub use self::document::{collection_path, DocumentStoreSink, DocumentWriter};
pub use self::http::{HttpPushSink, HttpWriter};
pub use self::metrics::MetricsSink;
