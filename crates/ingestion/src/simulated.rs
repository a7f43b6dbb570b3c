//! 模拟读数源
//!
//! 无 OPC-UA 服务器时使用：按固定间隔为每个 tag 生成一个读数。
//! Gauge 走确定性的正弦波形，Counter 单调递增。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::{MetricKind, Reading, ReadingSource, TagMetadata, TagValue};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};
use crate::stats::IngestionMetrics;

/// 最小生成间隔，`tokio::time::interval` 不接受零
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// 模拟源配置
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// 每轮之间的间隔
    pub interval: Duration,

    /// 最多生成多少轮（None = 直到 stop）
    pub max_rounds: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_rounds: None,
        }
    }
}

/// 模拟读数源
pub struct SimulatedSource {
    name: String,
    tags: Arc<[TagMetadata]>,
    config: SimulationConfig,
    running: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
}

impl SimulatedSource {
    /// Intervals shorter than `MIN_INTERVAL` are raised to it.
    ///
    /// # Errors
    /// `NoTags` if `tags` is empty.
    pub fn new(tags: Vec<TagMetadata>, mut config: SimulationConfig) -> Result<Self> {
        if tags.is_empty() {
            return Err(IngestionError::NoTags);
        }
        config.interval = config.interval.max(MIN_INTERVAL);
        Ok(Self {
            name: "simulated".to_string(),
            tags: tags.into(),
            config,
            running: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(IngestionMetrics::new()),
        })
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}

/// Value of tag number `index` in round `round`
///
/// Gauges oscillate around 50 with amplitude 25, each tag phase-shifted;
/// counters report `round` as their running total.
pub fn simulated_value(metric_kind: MetricKind, index: usize, round: u64) -> TagValue {
    match metric_kind {
        MetricKind::Gauge => {
            let phase = index as f64 * 0.7;
            let raw = 50.0 + 25.0 * (round as f64 * 0.1 + phase).sin();
            TagValue::Float64((raw * 1000.0).round() / 1000.0)
        }
        MetricKind::Counter => TagValue::UInt64(round),
    }
}

impl ReadingSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, channel_capacity: usize) -> mpsc::Receiver<Reading> {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let name = self.name.clone();
        let tags = Arc::clone(&self.tags);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let metrics = Arc::clone(&self.metrics);

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            let mut round: u64 = 0;

            debug!(
                source = %name,
                tags = tags.len(),
                interval_ms = config.interval.as_millis() as u64,
                "simulated source started"
            );

            'rounds: while running.load(Ordering::Relaxed) {
                if config.max_rounds.is_some_and(|max| round >= max) {
                    break;
                }
                ticker.tick().await;

                let timestamp = Utc::now();
                for (index, tag) in tags.iter().enumerate() {
                    let value = simulated_value(tag.metric_kind, index, round);
                    let reading = Reading::new(tag.tag_id.clone(), value, timestamp);

                    if tx.send(reading).await.is_err() {
                        debug!(source = %name, "simulated source channel closed");
                        break 'rounds;
                    }
                    metrics.record_emitted(&name);
                }

                trace!(source = %name, round, "simulated round sent");
                round += 1;
            }

            running.store(false, Ordering::SeqCst);
            debug!(source = %name, rounds = round, "simulated source stopped");
        });

        rx
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
