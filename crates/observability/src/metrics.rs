//! Prometheus 导出与分发统计
//!
//! Recorder 安装后，`dispatcher` 通过 `metrics` facade 写入的
//! tag gauge/counter 与分发计数都会出现在 `/{namespace}/metrics`。

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use dispatcher::DispatchSummary;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::info;

/// 安装全局 Prometheus recorder，返回用于渲染的 handle
///
/// 进程内只能调用一次。
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Scrape path for a logger namespace
pub fn metrics_path(namespace: &str) -> String {
    format!("/{namespace}/metrics")
}

/// Bind `addr` and serve `GET /{namespace}/metrics`
pub async fn serve_metrics(
    addr: SocketAddr,
    namespace: String,
    handle: PrometheusHandle,
) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        path = %metrics_path(&namespace),
        "Prometheus metrics endpoint listening"
    );
    serve_metrics_on(listener, &namespace, handle).await
}

/// Serve the scrape endpoint on an already bound listener
pub async fn serve_metrics_on(
    listener: TcpListener,
    namespace: &str,
    handle: PrometheusHandle,
) -> io::Result<()> {
    let app = Router::new()
        .route(&metrics_path(namespace), get(render_metrics))
        .with_state(handle);
    axum::serve(listener, app).await
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// 分发统计聚合器
///
/// 在内存中聚合每次 `try_publish` 的结果，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 成功解析并分发的读数
    pub dispatched: u64,

    /// 被拒绝的读数（未注册 tag 等）
    pub rejected: u64,

    /// sink 成功投递次数
    pub delivered: u64,

    /// numeric-only sink 跳过次数
    pub skipped: u64,

    /// sink 投递失败次数
    pub failed: u64,

    /// 各 value kind 的读数数量
    pub kind_counts: BTreeMap<&'static str, u64>,

    /// 单次分发耗时（微秒）
    pub latency_us: RunningStats,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功分发
    pub fn update(&mut self, summary: &DispatchSummary, latency: Duration) {
        self.dispatched += 1;
        self.delivered += summary.delivered as u64;
        self.skipped += summary.skipped as u64;
        self.failed += summary.failed as u64;
        *self.kind_counts.entry(summary.kind.as_str()).or_insert(0) += 1;
        self.latency_us.push(latency.as_secs_f64() * 1_000_000.0);
    }

    /// 记录一次被拒绝的读数
    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn summary(&self) -> DispatchStatsSummary {
        let total = self.dispatched + self.rejected;
        let attempts = self.delivered + self.failed;
        DispatchStatsSummary {
            readings: total,
            dispatched: self.dispatched,
            rejected: self.rejected,
            delivered: self.delivered,
            skipped: self.skipped,
            failed: self.failed,
            reject_rate: percent(self.rejected, total),
            failure_rate: percent(self.failed, attempts),
            kind_counts: self.kind_counts.clone(),
            latency_us: StatsSummary::from(&self.latency_us),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// 分发统计摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsSummary {
    pub readings: u64,
    pub dispatched: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub skipped: u64,
    pub failed: u64,
    pub reject_rate: f64,
    pub failure_rate: f64,
    pub kind_counts: BTreeMap<&'static str, u64>,
    pub latency_us: StatsSummary,
}

impl std::fmt::Display for DispatchStatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Readings: {}", self.readings)?;
        writeln!(
            f,
            "Rejected: {} ({:.2}%)",
            self.rejected, self.reject_rate
        )?;
        writeln!(f, "Deliveries: {}", self.delivered)?;
        writeln!(f, "Skipped (non-numeric): {}", self.skipped)?;
        writeln!(
            f,
            "Failed deliveries: {} ({:.2}%)",
            self.failed, self.failure_rate
        )?;
        writeln!(f, "Dispatch latency (us): {}", self.latency_us)?;

        if !self.kind_counts.is_empty() {
            writeln!(f, "Readings by kind:")?;
            for (kind, count) in &self.kind_counts {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
