//! 回放读数源
//!
//! 逐行读取 JSON lines 文件，每行一个读数：
//!
//! ```text
//! {"tagId": "ns=2;s=Temperature", "value": 23.5, "timestamp": "2024-05-01T12:00:00.000Z"}
//! ```
//!
//! `timestamp` 可省略（使用读取时刻）。格式错误或值类型不受支持的行
//! 记录警告后跳过。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{Reading, ReadingSource, TagValue};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::stats::IngestionMetrics;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLine {
    tag_id: String,
    value: serde_json::Value,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Parse one replay line; `line_no` is only used for error context
pub fn parse_line(line: &str, line_no: usize) -> Result<Reading> {
    let parsed: ReplayLine =
        serde_json::from_str(line).map_err(|e| IngestionError::parse_failed(line_no, e.to_string()))?;

    if parsed.tag_id.is_empty() {
        return Err(IngestionError::parse_failed(line_no, "empty tagId"));
    }

    let value = TagValue::try_from(&parsed.value).map_err(|source| IngestionError::Unsupported {
        line: line_no,
        source,
    })?;

    Ok(Reading::new(
        parsed.tag_id,
        value,
        parsed.timestamp.unwrap_or_else(Utc::now),
    ))
}

/// JSON lines 回放源
pub struct ReplaySource {
    name: String,
    path: PathBuf,
    /// Delay between readings (None = as fast as the consumer takes them)
    pace: Option<Duration>,
    running: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
}

impl ReplaySource {
    /// # Errors
    /// `ReplayOpen` if `path` is not a readable file.
    pub fn new(path: impl AsRef<Path>, pace: Option<Duration>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::metadata(&path).map_err(|source| IngestionError::ReplayOpen {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            name: "replay".to_string(),
            path,
            pace,
            running: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(IngestionMetrics::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}

impl ReadingSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, channel_capacity: usize) -> mpsc::Receiver<Reading> {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let replay = ReplayTask {
            name: self.name.clone(),
            path: self.path.clone(),
            pace: self.pace,
            running: Arc::clone(&self.running),
            metrics: Arc::clone(&self.metrics),
        };

        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let running = Arc::clone(&replay.running);
            if let Err(e) = replay.run(&tx).await {
                error!(error = %e, "replay source failed");
            }
            // Clear the flag before the channel closes
            running.store(false, Ordering::SeqCst);
            drop(tx);
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

struct ReplayTask {
    name: String,
    path: PathBuf,
    pace: Option<Duration>,
    running: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
}

impl ReplayTask {
    #[instrument(name = "replay_source", skip_all, fields(path = %self.path.display()))]
    async fn run(self, tx: &mpsc::Sender<Reading>) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0usize;

        debug!(source = %self.name, "replay started");

        while let Some(line) = lines.next_line().await? {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let reading = match parse_line(&line, line_no) {
                Ok(reading) => reading,
                Err(e) => {
                    self.metrics.record_parse_error(&self.name);
                    warn!(error = %e, "skipping replay line");
                    continue;
                }
            };

            if tx.send(reading).await.is_err() {
                debug!("replay channel closed");
                break;
            }
            self.metrics.record_emitted(&self.name);

            if let Some(pace) = self.pace {
                tokio::time::sleep(pace).await;
            }
        }

        debug!(source = %self.name, lines = line_no, "replay finished");
        Ok(())
    }
}
