//! DocumentStoreSink - one persisted document per reading
//!
//! Documents are JSON lines appended to `{base_path}/{namespace}.jsonl`, a
//! collection per logger namespace. The file is opened once and owned by
//! the worker task.

use std::path::{Path, PathBuf};

use contracts::{ContractError, DocumentStoreConfig, Publication, RecordWriter, Sink, TelemetryRecord};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::handle::{SinkHandle, SinkWorker};

/// Transport half: appends records to the namespace collection file
pub struct DocumentWriter {
    name: String,
    path: PathBuf,
    file: Option<File>,
}

impl DocumentWriter {
    /// Create `base_path` if needed and open the collection for appending
    #[instrument(name = "document_writer_open", skip(name, base_path))]
    pub async fn open(
        name: impl Into<String>,
        base_path: &Path,
        namespace: &str,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(base_path).await?;
        let path = collection_path(base_path, namespace);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let name = name.into();
        info!(sink = %name, path = %path.display(), "Document collection opened");

        Ok(Self {
            name,
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Collection file for a namespace
pub fn collection_path(base_path: &Path, namespace: &str) -> PathBuf {
    base_path.join(format!("{namespace}.jsonl"))
}

impl RecordWriter for DocumentWriter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), ContractError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ContractError::sink_write(&self.name, "collection closed"))?;

        let mut line = serde_json::to_vec(record)
            .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}")))?;
        line.push(b'\n');

        file.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(file) = self.file.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(file) = self.file.take() {
            file.sync_all().await?;
        }
        debug!(sink = %self.name, "Document collection closed");
        Ok(())
    }
}

/// Dispatcher-facing half: stamps the namespace and enqueues
pub struct DocumentStoreSink {
    handle: SinkHandle,
    namespace: String,
}

impl DocumentStoreSink {
    /// Open the collection and spawn the writer worker
    pub async fn spawn(
        config: &DocumentStoreConfig,
        namespace: &str,
    ) -> Result<(Self, SinkWorker), ContractError> {
        let writer = DocumentWriter::open("document_store", &config.base_path, namespace)
            .await
            .map_err(|e| ContractError::sink_connection("document_store", e.to_string()))?;
        let (handle, worker) = SinkHandle::spawn(writer, config.queue_capacity);

        Ok((
            Self {
                handle,
                namespace: namespace.to_string(),
            },
            worker,
        ))
    }

    pub fn handle(&self) -> &SinkHandle {
        &self.handle
    }
}

impl Sink for DocumentStoreSink {
    fn name(&self) -> &str {
        self.handle.name()
    }

    fn deliver(&self, publication: &Publication<'_>) -> Result<(), ContractError> {
        let record = publication.to_record().with_namespace(&self.namespace);
        self.handle.try_send(record)
    }
}
