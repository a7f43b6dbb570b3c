//! HttpPushSink - one POST per reading, fire-and-forget

use std::time::Duration;

use contracts::{
    ContractError, HttpAuth, HttpExporterConfig, Publication, RecordWriter, Sink, TelemetryRecord,
};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::handle::{SinkHandle, SinkWorker};

/// Transport half: posts records as JSON
pub struct HttpWriter {
    name: String,
    client: Client,
    url: String,
    auth: HttpAuth,
}

impl HttpWriter {
    pub fn new(name: impl Into<String>, config: &HttpExporterConfig) -> Result<Self, ContractError> {
        let name = name.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        Ok(Self {
            name,
            client,
            url: config.url.clone(),
            auth: config.auth.clone(),
        })
    }
}

impl RecordWriter for HttpWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_writer_write",
        skip(self, record),
        fields(sink = %self.name, tag_id = %record.tag_id)
    )]
    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), ContractError> {
        let request = self.client.post(&self.url).json(record);
        let request = match &self.auth {
            HttpAuth::None => request,
            HttpAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
            HttpAuth::Bearer { token } => request.bearer_auth(token),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ContractError::sink_connection(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::sink_write(
                &self.name,
                format!("{} responded {}", self.url, status),
            ));
        }

        debug!(sink = %self.name, status = status.as_u16(), "Pushed");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

/// Dispatcher-facing half: enqueues records for the `HttpWriter` worker
pub struct HttpPushSink {
    handle: SinkHandle,
}

impl HttpPushSink {
    /// Build the client and spawn the push worker
    pub fn spawn(config: &HttpExporterConfig) -> Result<(Self, SinkWorker), ContractError> {
        let writer = HttpWriter::new("http", config)?;
        let (handle, worker) = SinkHandle::spawn(writer, config.queue_capacity);
        Ok((Self { handle }, worker))
    }

    pub fn handle(&self) -> &SinkHandle {
        &self.handle
    }
}

impl Sink for HttpPushSink {
    fn name(&self) -> &str {
        self.handle.name()
    }

    fn deliver(&self, publication: &Publication<'_>) -> Result<(), ContractError> {
        self.handle.try_send(publication.to_record())
    }
}
