//! Storage error types.

use serde::Deserialize;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage client configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Account authorization was refused.
    #[error("account authorization failed ({status}): {message}")]
    Authorization {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// Provider answered with a non-2xx status.
    #[error("provider error {status} {code}: {message}")]
    Provider {
        /// HTTP status.
        status: u16,
        /// Provider error code, e.g. `expired_auth_token`.
        code: String,
        /// Provider message.
        message: String,
    },

    /// Network failure or timeout before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider response could not be decoded.
    #[error("unexpected provider response: {0}")]
    Decode(String),

    /// Stored bytes do not hash to the expected SHA-1.
    #[error("content hash mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// Hash sent with the upload.
        expected: String,
        /// Hash reported or observed.
        actual: String,
    },
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a provider error from a status and the raw error body.
    ///
    /// B2 error bodies look like `{"status":401,"code":"...","message":"..."}`;
    /// anything else is kept verbatim as the message.
    #[must_use]
    pub fn provider(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ProviderErrorBody>(body) {
            Ok(parsed) => Self::Provider {
                status,
                code: parsed.code,
                message: parsed.message,
            },
            Err(_) => Self::Provider {
                status,
                code: "unknown".to_string(),
                message: body.trim().to_string(),
            },
        }
    }

    /// Build an authorization error from the `b2_authorize_account` reply.
    #[must_use]
    pub fn authorization(status: u16, body: &str) -> Self {
        let message = match Self::provider(status, body) {
            Self::Provider { message, .. } => message,
            other => other.to_string(),
        };
        Self::Authorization { status, message }
    }

    /// Whether the provider rejected the session token.
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Provider { status: 401, .. })
    }

    /// Whether repeating the same idempotent request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Provider { status, .. } => {
                matches!(*status, 401 | 408 | 429) || *status >= 500
            }
            Self::Authorization { status, .. } => *status >= 500,
            Self::Configuration(_) | Self::Decode(_) | Self::IntegrityMismatch { .. } => false,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
