//! ReadingSource trait - where readings come from
//!
//! The production source is an OPC-UA monitor living outside this
//! workspace; the simulated and replay sources implement the same trait.

use tokio::sync::mpsc;

use crate::Reading;

/// Producer of `(tag, value, timestamp)` observations
pub trait ReadingSource: Send + Sync {
    fn name(&self) -> &str;

    /// Start producing readings into a bounded channel
    ///
    /// Must be called from within a tokio runtime. The channel closes when
    /// the source is exhausted or stopped.
    fn start(&self, channel_capacity: usize) -> mpsc::Receiver<Reading>;

    /// Stop producing; idempotent
    fn stop(&self);

    fn is_running(&self) -> bool;
}
