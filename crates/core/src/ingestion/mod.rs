//! The upload gateway: `validate → normalize → store → record`.
//!
//! Each stage returns a typed error and the first failure ends the request.
//! Validation runs before any disk or network I/O. Conversion temp files are
//! released by the normalizer itself. A metadata failure after a successful
//! store triggers a compensating delete so no unreferenced object is left in
//! the bucket.

mod error;
mod service;

#[cfg(all(test, unix))]
mod service_tests;

pub use error::IngestionError;
pub use service::{IngestionOutcome, IngestionService, PDF_CONTENT_TYPE, UploadRequest};
