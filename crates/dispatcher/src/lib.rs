//! # Dispatcher
//!
//! 读数分发模块。
//!
//! 负责：
//! - 通过 `TagRegistry` 解析 tag 元数据
//! - 将 `TagValue` 归一化为 kind + 数值样本
//! - Fan-out 到已启用的 sinks，单个 sink 失败不影响其余 sinks

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod normalize;
pub mod registry;
pub mod sinks;

pub use contracts::{Publication, Sink, TagValue};
pub use dispatcher::{DispatchSummary, Dispatcher, DispatcherBuilder, Exporters};
pub use error::DispatcherError;
pub use handle::{SinkHandle, SinkWorker};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use normalize::normalize;
pub use registry::TagRegistry;
pub use sinks::{
    serve_websockets, serve_websockets_on, BroadcastHub, BroadcastSink, DocumentStoreSink,
    HttpPushSink, MetricsSink,
};
