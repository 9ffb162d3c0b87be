//! Bearer identity-token verification.
//!
//! This is the gate every upload request passes before any pipeline work
//! starts: the `Authorization` header must be `Bearer <token>` where the token
//! is a three-segment JWT signed by the identity provider.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::Claims;
use crate::config::AuthConfig;

/// Errors that can occur while verifying a bearer credential.
#[derive(Debug, Error)]
pub enum JwtError {
    /// No `Authorization` header was sent.
    #[error("missing bearer token")]
    Missing,

    /// Header or token does not have the expected shape.
    #[error("malformed bearer token: {0}")]
    Malformed(&'static str),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token was rejected by the verifier.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),
}

impl JwtError {
    /// Whether the caller never presented a usable credential at all.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Missing | Self::Malformed(_))
    }
}

/// Extracts the bearer token from the Authorization header.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A JWT is exactly three non-empty, dot-separated segments.
fn is_three_part(token: &str) -> bool {
    let mut parts = 0;
    for segment in token.split('.') {
        if segment.is_empty() {
            return false;
        }
        parts += 1;
    }
    parts == 3
}

/// JWT service for identity-token operations.
#[derive(Clone)]
pub struct JwtService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Verifies a raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Missing`/`JwtError::Malformed` when no well-formed
    /// bearer credential is present, `JwtError::Expired` or
    /// `JwtError::Invalid` when the token itself is rejected.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, JwtError> {
        let header = header.ok_or(JwtError::Missing)?;
        let token = extract_bearer_token(header)
            .ok_or(JwtError::Malformed("expected `Bearer <token>`"))?;
        self.validate_token(token)
    }

    /// Validates and decodes a token.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Malformed` if the token is not three segments,
    /// `JwtError::Expired` if it has expired and `JwtError::Invalid` otherwise.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        if !is_three_part(token) {
            return Err(JwtError::Malformed("token is not a three-part JWT"));
        }

        let mut validation = Validation::default();
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }

    /// Issues a token for the given identity.
    ///
    /// Production tokens come from the identity provider; this exists for
    /// local tooling and tests that share the provider secret.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn issue(
        &self,
        uid: &str,
        email: &str,
        role: &str,
        company_id: Option<&str>,
    ) -> Result<String, JwtError> {
        let ttl = i64::try_from(self.config.token_ttl_secs).unwrap_or(i64::MAX);
        let expires_at = Utc::now() + Duration::seconds(ttl);
        let claims = Claims::new(uid, email, role, company_id, expires_at);
        self.encode_claims(&claims)
    }

    /// Encodes arbitrary claims with the configured secret.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }
}
