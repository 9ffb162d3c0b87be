//! Liveness endpoint.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use dossier_core::document::DocumentRecorder;

use crate::AppState;

/// Liveness response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// GET `/health`
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "dossier",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates the health route. No authentication.
pub fn routes<R: DocumentRecorder + 'static>() -> Router<AppState<R>> {
    Router::new().route("/health", get(health))
}
