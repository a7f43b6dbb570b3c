//! Pipeline orchestrator - wires a reading source to the dispatcher.
//!
//! Startup order: source, dispatcher and queued sinks, then the metrics
//! and websocket servers; the source only starts producing once all of
//! them are up. Shutdown runs the other way round so every reading the
//! dispatcher accepted reaches its queued sinks.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use contracts::{LoggerBlueprint, ReadingSource};
use dispatcher::{DispatcherBuilder, Exporters};
use ingestion::{ReplaySource, SimulatedSource, SimulationConfig};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::cli::SourceKind;
use crate::error::{CliError, Result};

/// Upper bound on how long queued sinks get to drain at shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The validated logger configuration
    pub blueprint: LoggerBlueprint,

    /// Which source produces readings
    pub source: SourceKind,

    /// JSON lines file (replay source only)
    pub replay_path: Option<PathBuf>,

    /// Simulation interval, or replay pacing (zero = unpaced)
    pub interval: Duration,

    /// Maximum number of readings to process (None = unlimited)
    pub max_readings: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size between source and dispatcher
    pub buffer_size: usize,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

/// Background servers started for the enabled exporters
#[derive(Default)]
struct Servers {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Servers {
    fn spawn<F>(&mut self, name: &'static str, server: F)
    where
        F: Future<Output = std::io::Result<()>> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                warn!(server = name, error = %e, "Server stopped with error");
            }
        });
        self.tasks.push((name, task));
    }

    fn abort_all(self) {
        for (name, task) in self.tasks {
            task.abort();
            debug!(server = name, "Server stopped");
        }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Build the reading source selected on the command line
    fn build_source(&self) -> Result<Box<dyn ReadingSource>> {
        match self.config.source {
            SourceKind::Simulate => {
                let source = SimulatedSource::new(
                    self.config.blueprint.tags.clone(),
                    SimulationConfig {
                        interval: self.config.interval,
                        max_rounds: None,
                    },
                )?;
                Ok(Box::new(source))
            }
            SourceKind::Replay => {
                let path = self
                    .config
                    .replay_path
                    .as_ref()
                    .ok_or(CliError::ReplayPathMissing)?;
                if !path.exists() {
                    return Err(CliError::replay_not_found(path));
                }
                let pace = (!self.config.interval.is_zero()).then_some(self.config.interval);
                Ok(Box::new(ReplaySource::new(path, pace)?))
            }
        }
    }

    /// Start the scrape and websocket endpoints for the enabled exporters
    fn start_servers(&self, exporters: &Exporters) -> Result<Servers> {
        let blueprint = &self.config.blueprint;
        let enabled = blueprint.enabled_sinks();
        let mut servers = Servers::default();

        if enabled.metrics {
            let handle = observability::install_recorder()
                .map_err(|e| CliError::observability(format!("{e:#}")))?;
            servers.spawn(
                "metrics",
                observability::serve_metrics(
                    blueprint.exporters.metrics.bind,
                    exporters.dispatcher.context().namespace.clone(),
                    handle,
                ),
            );
        }

        if let Some(hub) = exporters.broadcast_hub.clone() {
            servers.spawn(
                "websocket",
                dispatcher::serve_websockets(blueprint.exporters.broadcast.bind, hub),
            );
        }

        Ok(servers)
    }

    /// Run until the source is exhausted, a limit is hit, or `shutdown` resolves
    pub async fn run<S>(self, shutdown: S) -> Result<PipelineStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        info!(
            logger = %blueprint.logger.name,
            source_url = %blueprint.source.url,
            tags = blueprint.tags.len(),
            "Setting up dispatcher..."
        );
        let source = self.build_source()?;
        let exporters = DispatcherBuilder::new(blueprint).build().await?;
        if exporters.dispatcher.sink_names().is_empty() {
            warn!("No exporters enabled - readings will be resolved and dropped");
        }

        let servers = match self.start_servers(&exporters) {
            Ok(servers) => servers,
            Err(e) => {
                exporters.shutdown().await;
                return Err(e);
            }
        };

        let mut stats = PipelineStats {
            active_tags: exporters.dispatcher.registry().len(),
            sinks: exporters
                .dispatcher
                .sink_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            source: source.name().to_string(),
            ..Default::default()
        };

        info!(
            source = %stats.source,
            sinks = ?stats.sinks,
            max_readings = ?self.config.max_readings,
            "Pipeline running"
        );

        let mut rx = source.start(self.config.buffer_size);
        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        loop {
            let reading = tokio::select! {
                reading = rx.recv() => match reading {
                    Some(reading) => reading,
                    None => {
                        info!("Source exhausted");
                        break;
                    }
                },
                _ = &mut deadline => {
                    warn!(timeout_secs = ?self.config.timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    break;
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break;
                }
            };

            stats.readings_received += 1;
            let started = Instant::now();
            match exporters.dispatcher.try_publish(
                &reading.tag_id,
                &reading.value,
                reading.timestamp,
            ) {
                Ok(summary) => stats.dispatch.update(&summary, started.elapsed()),
                Err(e) => {
                    stats.dispatch.record_rejected();
                    warn!(tag_id = %reading.tag_id, error = %e, "Reading not dispatched");
                }
            }

            if let Some(max) = self.config.max_readings {
                if stats.readings_received >= max {
                    info!(readings = stats.readings_received, "Reached max readings limit");
                    break;
                }
            }
        }

        info!("Shutting down pipeline...");
        source.stop();
        drop(rx);

        let queues = exporters.queues.clone();

        if tokio::time::timeout(DRAIN_TIMEOUT, exporters.shutdown())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "Queued sinks did not drain in time"
            );
        }
        servers.abort_all();

        stats.queues = queues
            .into_iter()
            .map(|(name, metrics)| (name, metrics.snapshot()))
            .collect();

        stats.duration = start_time.elapsed();
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.readings_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}
