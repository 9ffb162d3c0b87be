//! Document repository for database operations.
//!
//! Implements the ingestion pipeline's metadata recorder using SeaORM.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::debug;
use uuid::Uuid;

use crate::entities::documents;
use dossier_core::document::{DocumentRecorder, NewDocument, RecorderError};

/// Document repository implementation.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
}

impl DocumentRepository {
    /// Create a new document repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl DocumentRecorder for DocumentRepository {
    async fn create(&self, doc: NewDocument) -> Result<Uuid, RecorderError> {
        let id = Uuid::now_v7();
        let model = to_active_model(id, doc)?
            .insert(&self.db)
            .await
            .map_err(|e| RecorderError::store(e.to_string()))?;

        debug!(document_id = %model.id, key = %model.storage_key, "Document recorded");
        Ok(model.id)
    }
}

fn to_active_model(id: Uuid, doc: NewDocument) -> Result<documents::ActiveModel, RecorderError> {
    let size_bytes = i64::try_from(doc.size)
        .map_err(|_| RecorderError::store(format!("size {} out of range", doc.size)))?;

    Ok(documents::ActiveModel {
        id: Set(id),
        original_name: Set(doc.original_name),
        content_type: Set(doc.content_type),
        url: Set(doc.url),
        storage_key: Set(doc.storage_key),
        file_id: Set(doc.file_id),
        content_sha1: Set(doc.content_sha1),
        size_bytes: Set(size_bytes),
        uploaded_at: Set(doc.uploaded_at.into()),
        uploader_uid: Set(doc.uploader_uid),
        uploader_email: Set(doc.uploader_email),
        company_id: Set(doc.company_id),
        estado: Set(doc.estado.as_str().to_string()),
        created_at: Set(Utc::now().into()),
    })
}
