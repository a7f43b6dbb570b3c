//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Readings carry the source-assigned UTC timestamp (`chrono::DateTime<Utc>`)
//! - Records on the wire use RFC 3339 with millisecond precision

mod blueprint;
mod error;
mod record;
mod sink;
mod source;
mod tag;
mod tag_id;
mod value;

pub use blueprint::*;
pub use error::*;
pub use record::*;
pub use sink::*;
pub use source::ReadingSource;
pub use tag::*;
pub use tag_id::TagId;
pub use value::*;
