//! Sink traits - Dispatcher output interface
//!
//! `Sink` is what the dispatcher calls for every reading. It is synchronous
//! and must not block: transports doing I/O hand the record to their own
//! worker, which drives a `RecordWriter`.

use crate::{ContractError, Publication, TelemetryRecord};

/// Delivery target for published readings
pub trait Sink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Sinks that only accept numeric samples
    ///
    /// The dispatcher skips such a sink for readings without a numeric
    /// projection instead of calling it.
    fn numeric_only(&self) -> bool {
        false
    }

    /// Hand one publication to the sink
    ///
    /// # Errors
    /// Returns the delivery error; the dispatcher logs it and carries on
    /// with the remaining sinks.
    fn deliver(&self, publication: &Publication<'_>) -> Result<(), ContractError>;
}

/// Asynchronous transport behind a queued sink
#[trait_variant::make(RecordWriter: Send)]
pub trait LocalRecordWriter {
    fn name(&self) -> &str;

    /// Write one record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, record: &TelemetryRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close writer
    async fn close(&mut self) -> Result<(), ContractError>;
}
