//! Document upload routes.
//!
//! Both endpoints take a multipart body with a single `file` part and run it
//! through the ingestion pipeline; `/convert` normalizes it to PDF first.

use axum::{
    Json, Router,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::post,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppState, error::ApiError, middleware::AuthUser};
use dossier_core::document::DocumentRecorder;
use dossier_core::ingestion::UploadRequest;
use dossier_shared::AppError;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// Creates the document routes.
pub fn routes<R: DocumentRecorder + 'static>() -> Router<AppState<R>> {
    Router::new()
        .route("/upload", post(upload::<R>))
        .route("/convert", post(convert::<R>))
}

/// Response for a stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Always `true`.
    pub success: bool,
    /// Public URL of the stored object.
    pub url: String,
}

/// Response for a converted upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Always `true`.
    pub success: bool,
    /// Public URL of the stored PDF.
    pub url: String,
    /// Name the client uploaded the file under.
    pub original_name: String,
    /// Name given to the PDF.
    pub pdf_name: String,
}

/// The `file` part of a multipart body.
struct FilePart {
    bytes: Bytes,
    content_type: Option<String>,
    file_name: String,
}

/// Pull the `file` part out of the body; other parts are skipped.
async fn read_file_part(
    multipart: Result<Multipart, MultipartRejection>,
    max_file_size: u64,
) -> Result<FilePart, ApiError> {
    let body_error = |err: MultipartError| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!(error = %err, "Upload exceeds the body limit");
            AppError::FileTooLarge { max: max_file_size }
        } else {
            AppError::Validation(err.body_text())
        }
    };

    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Request body is not multipart");
        AppError::MissingFile
    })?;

    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(body_error)?;

        return Ok(FilePart {
            bytes,
            content_type,
            file_name,
        });
    }

    Err(AppError::MissingFile.into())
}

fn upload_request(auth: &AuthUser, part: FilePart) -> UploadRequest {
    UploadRequest {
        bytes: part.bytes,
        content_type: part.content_type,
        original_name: part.file_name,
        identity: auth.identity(),
    }
}

/// POST `/upload`
/// Store the file as-is.
async fn upload<R: DocumentRecorder>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let part = read_file_part(multipart, state.ingestion.upload_config().max_file_size).await?;
    let outcome = state
        .ingestion
        .handle_upload(upload_request(&auth, part), false)
        .await?;

    info!(uid = %auth.uid(), record_id = %outcome.record_id, "Upload stored");

    Ok(Json(UploadResponse {
        success: true,
        url: outcome.stored.url,
    }))
}

/// POST `/convert`
/// Convert the file to PDF, then store it.
async fn convert<R: DocumentRecorder>(
    State(state): State<AppState<R>>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let part = read_file_part(multipart, state.ingestion.upload_config().max_file_size).await?;
    let outcome = state
        .ingestion
        .handle_upload(upload_request(&auth, part), true)
        .await?;

    info!(uid = %auth.uid(), record_id = %outcome.record_id, "Converted upload stored");

    Ok(Json(ConvertResponse {
        success: true,
        url: outcome.stored.url,
        original_name: outcome.original_name,
        pdf_name: outcome.pdf_name.unwrap_or_default(),
    }))
}
