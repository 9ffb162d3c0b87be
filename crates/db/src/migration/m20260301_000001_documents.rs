//! Documents table for ingested uploads.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS documents CASCADE;")
            .await?;
        Ok(())
    }
}

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    original_name TEXT NOT NULL,
    content_type VARCHAR(255) NOT NULL,
    url TEXT NOT NULL,
    storage_key TEXT NOT NULL UNIQUE,
    file_id VARCHAR(200) NOT NULL,
    content_sha1 CHAR(40) NOT NULL,
    size_bytes BIGINT NOT NULL,
    uploaded_at TIMESTAMPTZ NOT NULL,
    uploader_uid VARCHAR(128) NOT NULL,
    uploader_email VARCHAR(320) NOT NULL,
    company_id VARCHAR(128),
    estado VARCHAR(64) NOT NULL DEFAULT 'pendiente de revisión',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_sha1_hex CHECK (content_sha1 ~ '^[0-9a-f]{40}$'),
    CONSTRAINT chk_size_positive CHECK (size_bytes > 0),
    CONSTRAINT chk_estado CHECK (estado IN ('pendiente de revisión', 'aprobado', 'rechazado'))
);

-- Review queue per company
CREATE INDEX idx_documents_company_estado ON documents(company_id, estado, uploaded_at DESC);

-- Uploader history
CREATE INDEX idx_documents_uploader ON documents(uploader_uid, uploaded_at DESC);
";
