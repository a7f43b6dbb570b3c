//! # Ingestion
//!
//! Reading sources that feed the dispatcher.
//!
//! The production source (an OPC-UA subscription) lives outside this
//! workspace; both sources here implement the same `ReadingSource` contract:
//!
//! - `SimulatedSource`: one reading per configured tag per interval
//! - `ReplaySource`: JSON lines recorded from a previous run
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::ReadingSource;
//! use ingestion::{SimulatedSource, SimulationConfig};
//!
//! let source = SimulatedSource::new(blueprint.tags.clone(), SimulationConfig::default())?;
//! let mut rx = source.start(256);
//! while let Some(reading) = rx.recv().await {
//!     dispatcher.publish_reading(&reading);
//! }
//! ```

mod error;
mod replay;
mod simulated;
mod stats;

pub use contracts::{Reading, ReadingSource};
pub use error::{IngestionError, Result};
pub use replay::{parse_line, ReplaySource};
pub use simulated::{simulated_value, SimulatedSource, SimulationConfig};
pub use stats::{IngestionMetrics, MetricsSnapshot};
