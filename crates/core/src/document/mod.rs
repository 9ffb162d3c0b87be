//! Document records and the persistence seam.
//!
//! The ingestion pipeline describes a stored upload with a [`NewDocument`]
//! and hands it to a [`DocumentRecorder`]. The recorder is implemented by
//! the database layer; this crate only defines the contract.

mod recorder;
mod types;

pub use recorder::{DocumentRecorder, RecorderError};
pub use types::{DocumentStatus, NewDocument};
