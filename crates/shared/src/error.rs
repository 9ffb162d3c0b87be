//! Application-wide error types.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// No usable bearer credential was presented.
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// The credential was presented but rejected.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The credential has expired.
    #[error("Credential expired")]
    CredentialExpired,

    /// Request carried no file payload.
    #[error("No file was uploaded")]
    MissingFile,

    /// Payload exceeds the configured size limit.
    #[error("File too large: maximum is {max} bytes")]
    FileTooLarge {
        /// Configured maximum.
        max: u64,
    },

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// External converter failed.
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Object store rejected or failed the write.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// Metadata write failed after the object was stored.
    #[error("Metadata write failed: {0}")]
    Recorder(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) | Self::InvalidCredential(_) | Self::CredentialExpired => 401,
            Self::MissingFile | Self::FileTooLarge { .. } | Self::Validation(_) => 400,
            Self::Conversion(_) | Self::Storage(_) | Self::Recorder(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::InvalidCredential(_) => "INVALID_CREDENTIAL",
            Self::CredentialExpired => "CREDENTIAL_EXPIRED",
            Self::MissingFile => "MISSING_FILE",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conversion(_) => "CONVERSION_FAILURE",
            Self::Storage(_) => "STORE_FAILURE",
            Self::Recorder(_) => "RECORDER_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<crate::jwt::JwtError> for AppError {
    fn from(err: crate::jwt::JwtError) -> Self {
        use crate::jwt::JwtError;
        match err {
            JwtError::Missing | JwtError::Malformed(_) => Self::Unauthenticated(err.to_string()),
            JwtError::Expired => Self::CredentialExpired,
            JwtError::Invalid(msg) => Self::InvalidCredential(msg),
            JwtError::EncodingError(msg) => Self::Internal(msg),
        }
    }
}
