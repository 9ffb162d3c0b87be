//! Metadata recorder contract.

use thiserror::Error;
use uuid::Uuid;

use super::types::NewDocument;

/// Metadata write errors.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The backing store rejected or failed the write.
    #[error("metadata store error: {0}")]
    Store(String),
}

impl RecorderError {
    /// Create a store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

/// Persists document metadata after a successful store.
pub trait DocumentRecorder: Send + Sync {
    /// Insert a record and return its ID.
    fn create(
        &self,
        doc: NewDocument,
    ) -> impl std::future::Future<Output = Result<Uuid, RecorderError>> + Send;
}
