//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus recorder 安装，按 namespace 暴露 `/{namespace}/metrics`
//! - 分发统计聚合 (`DispatchStatsAggregator`)
//!
//! ## 使用示例
//!
//! ```ignore
//! observability::init()?;
//! let handle = observability::install_recorder()?;
//! tokio::spawn(observability::serve_metrics(bind, "PlantFloor".into(), handle));
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    install_recorder, metrics_path, serve_metrics, serve_metrics_on, DispatchStatsAggregator,
    DispatchStatsSummary, RunningStats, StatsSummary,
};
pub use metrics_exporter_prometheus::PrometheusHandle;

/// 初始化 Tracing（默认配置）
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认日志级别（`RUST_LOG` 未设置时使用）
    pub default_log_level: String,
    /// 忽略 `RUST_LOG`，强制使用 `default_log_level`
    pub force_level: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            force_level: false,
        }
    }
}

impl ObservabilityConfig {
    /// Level from CLI flags: quiet wins, otherwise one step per `-v`
    pub fn from_verbosity(log_format: LogFormat, verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format,
            default_log_level: level.to_string(),
            force_level: quiet,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.force_level {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化 Tracing
///
/// Prometheus recorder 单独通过 [`install_recorder`] 安装，
/// 因为只有启用 metrics exporter 时才需要。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "Observability initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_log_level, "info");
        assert!(!config.force_level);
    }

    #[test]
    fn test_from_verbosity() {
        let c = ObservabilityConfig::from_verbosity(LogFormat::Pretty, 0, false);
        assert_eq!(c.default_log_level, "info");

        let c = ObservabilityConfig::from_verbosity(LogFormat::Pretty, 2, false);
        assert_eq!(c.default_log_level, "trace");

        let c = ObservabilityConfig::from_verbosity(LogFormat::Compact, 3, true);
        assert_eq!(c.default_log_level, "warn");
        assert!(c.force_level);
    }
}
