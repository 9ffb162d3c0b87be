//! Upload gateway service.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use dossier_shared::{Identity, UploadConfig};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::IngestionError;
use crate::conversion::FormatNormalizer;
use crate::document::{DocumentRecorder, DocumentStatus, NewDocument};
use crate::storage::{PutRequest, StorageClient, StoredObject};

/// Content type of every converted document.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// One authenticated upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Payload.
    pub bytes: Bytes,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// Client-supplied file name.
    pub original_name: String,
    /// Verified uploader.
    pub identity: Identity,
}

/// Result of a completed upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionOutcome {
    /// The stored object.
    pub stored: StoredObject,
    /// Metadata record ID.
    pub record_id: Uuid,
    /// Client-supplied file name.
    pub original_name: String,
    /// Name given to the converted PDF, when converted.
    pub pdf_name: Option<String>,
}

/// Orchestrates validation, conversion, storage and metadata recording.
pub struct IngestionService<R: DocumentRecorder> {
    storage: Arc<StorageClient>,
    normalizer: Arc<FormatNormalizer>,
    recorder: Arc<R>,
    upload: UploadConfig,
}

impl<R: DocumentRecorder> IngestionService<R> {
    /// Create a new ingestion service.
    #[must_use]
    pub fn new(
        storage: Arc<StorageClient>,
        normalizer: Arc<FormatNormalizer>,
        recorder: Arc<R>,
        upload: UploadConfig,
    ) -> Self {
        Self {
            storage,
            normalizer,
            recorder,
            upload,
        }
    }

    /// Upload limits in effect.
    #[must_use]
    pub fn upload_config(&self) -> &UploadConfig {
        &self.upload
    }

    /// Run one upload through the pipeline.
    ///
    /// With `with_conversion` the payload is converted to PDF first and the
    /// stored content type is always `application/pdf`. Exactly one store
    /// write happens, followed on success by exactly one metadata write.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload is empty or too large (no I/O has happened)
    /// - Conversion fails
    /// - The object store rejects the write
    /// - The metadata write fails (the stored object is deleted again)
    pub async fn handle_upload(
        &self,
        request: UploadRequest,
        with_conversion: bool,
    ) -> Result<IngestionOutcome, IngestionError> {
        self.validate(&request)?;

        let UploadRequest {
            bytes,
            content_type,
            original_name,
            identity,
        } = request;

        let (bytes, content_type, pdf_name) = if with_conversion {
            let pdf = self.normalizer.normalize(&bytes, &original_name).await?;
            let pdf_name = format!("{}.pdf", Utc::now().timestamp_millis());
            (Bytes::from(pdf), PDF_CONTENT_TYPE.to_string(), Some(pdf_name))
        } else {
            let content_type = content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
            (bytes, content_type, None)
        };

        let stored = self
            .storage
            .put(PutRequest {
                bytes,
                content_type,
                folder: self.upload.folder.clone(),
                original_name: original_name.clone(),
                sha1: None,
            })
            .await?;

        let doc = NewDocument {
            original_name: original_name.clone(),
            content_type: stored.content_type.clone(),
            url: stored.url.clone(),
            storage_key: stored.key.clone(),
            file_id: stored.file_id.clone(),
            content_sha1: stored.content_sha1.clone(),
            size: stored.size,
            uploaded_at: Utc::now(),
            company_id: company_scope(&identity),
            uploader_uid: identity.uid,
            uploader_email: identity.email,
            estado: DocumentStatus::PendingReview,
        };

        let record_id = match self.recorder.create(doc).await {
            Ok(id) => id,
            Err(source) => {
                let orphan_removed = self.remove_orphan(&stored).await;
                return Err(IngestionError::Recorder {
                    source,
                    orphan_removed,
                });
            }
        };

        info!(
            record_id = %record_id,
            key = %stored.key,
            converted = with_conversion,
            "Document ingested"
        );

        Ok(IngestionOutcome {
            stored,
            record_id,
            original_name,
            pdf_name,
        })
    }

    fn validate(&self, request: &UploadRequest) -> Result<(), IngestionError> {
        if request.bytes.is_empty() {
            return Err(IngestionError::MissingFile);
        }

        let size = u64::try_from(request.bytes.len()).unwrap_or(u64::MAX);
        if size > self.upload.max_file_size {
            return Err(IngestionError::FileTooLarge {
                size,
                max: self.upload.max_file_size,
            });
        }

        Ok(())
    }

    async fn remove_orphan(&self, stored: &StoredObject) -> bool {
        warn!(key = %stored.key, "Metadata write failed, deleting stored object");
        match self.storage.delete(stored).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    key = %stored.key,
                    file_id = %stored.file_id,
                    error = %e,
                    "Failed to delete orphaned object"
                );
                false
            }
        }
    }
}

/// Company recorded with the document.
///
/// Privileged uploaders act across companies, so none is recorded for them.
fn company_scope(identity: &Identity) -> Option<String> {
    if identity.is_privileged() {
        None
    } else {
        identity.company_id.clone()
    }
}
