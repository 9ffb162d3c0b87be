//! API route definitions.

use axum::{Router, middleware};

use dossier_core::document::DocumentRecorder;

use crate::{AppState, middleware::auth_middleware};

pub mod documents;
pub mod health;

#[cfg(all(test, unix))]
mod documents_tests;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state<R: DocumentRecorder + 'static>(
    state: AppState<R>,
) -> Router<AppState<R>> {
    let protected_routes = Router::new()
        .merge(documents::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<R>,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
