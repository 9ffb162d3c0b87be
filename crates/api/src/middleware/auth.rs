//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{AppState, error::ApiError};
use dossier_core::document::DocumentRecorder;
use dossier_shared::{AppError, Claims, Identity};

/// Authentication middleware that verifies identity tokens.
///
/// This middleware:
/// 1. Reads the `Authorization` header
/// 2. Verifies the bearer token with the JWT service
/// 3. Stores the claims in request extensions for handlers to access
///
/// The request body is not read when verification fails.
pub async fn auth_middleware<R: DocumentRecorder>(
    State(state): State<AppState<R>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match state.jwt_service.verify_header(auth_header) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected request credential");
            ApiError::from(e).into_response()
        }
    }
}

/// Extractor for the authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.0.sub
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.0.identity()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthenticated("Authentication required".into()).into())
    }
}
