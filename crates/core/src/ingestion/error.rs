//! Ingestion error types.

use dossier_shared::AppError;
use thiserror::Error;

use crate::conversion::ConversionError;
use crate::document::RecorderError;
use crate::storage::StorageError;

/// Upload pipeline errors.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// No payload, or an empty one.
    #[error("no file was uploaded")]
    MissingFile,

    /// Payload exceeds the configured limit.
    #[error("file too large: {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge {
        /// Payload size.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// Format conversion failed.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// Object store write failed.
    #[error("store failed: {0}")]
    Store(#[from] StorageError),

    /// Metadata write failed after the object was stored.
    #[error("metadata write failed (stored object removed: {orphan_removed}): {source}")]
    Recorder {
        /// Underlying recorder error.
        source: RecorderError,
        /// Whether the compensating delete succeeded.
        orphan_removed: bool,
    },
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::MissingFile => Self::MissingFile,
            IngestionError::FileTooLarge { max, .. } => Self::FileTooLarge { max },
            IngestionError::Conversion(e) => Self::Conversion(e.to_string()),
            IngestionError::Store(e) => Self::Storage(e.to_string()),
            e @ IngestionError::Recorder { .. } => Self::Recorder(e.to_string()),
        }
    }
}
