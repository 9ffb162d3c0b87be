//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The upload and convert endpoints
//! - Bearer-token authentication middleware
//! - JSON error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dossier_core::document::DocumentRecorder;
use dossier_core::ingestion::IngestionService;
use dossier_db::DocumentRepository;
use dossier_shared::JwtService;

pub use error::ApiError;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers.
///
/// Generic over the metadata recorder; the server runs it with the Postgres
/// [`DocumentRepository`].
pub struct AppState<R: DocumentRecorder = DocumentRepository> {
    /// JWT service for identity verification.
    pub jwt_service: Arc<JwtService>,
    /// Upload pipeline.
    pub ingestion: Arc<IngestionService<R>>,
}

impl<R: DocumentRecorder> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            jwt_service: Arc::clone(&self.jwt_service),
            ingestion: Arc::clone(&self.ingestion),
        }
    }
}

/// Creates the main application router.
pub fn create_router<R: DocumentRecorder + 'static>(state: AppState<R>) -> Router {
    let max_file_size =
        usize::try_from(state.ingestion.upload_config().max_file_size).unwrap_or(usize::MAX);

    Router::new()
        .nest("/api", routes::api_routes_with_state(state.clone()))
        .layer(DefaultBodyLimit::max(
            max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
