//! Conversion error types.

use std::time::Duration;

use thiserror::Error;

/// Format conversion errors.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The converter program could not be started.
    #[error("failed to start converter {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// OS error text.
        message: String,
    },

    /// The converter exited unsuccessfully.
    #[error("converter exited with {}: {stderr}", exit_label(.exit_code))]
    Failed {
        /// Exit code, `None` when killed by a signal.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The converter ran past its deadline and was killed.
    #[error("converter timed out after {0:?}")]
    TimedOut(Duration),

    /// The converter exited cleanly but wrote no output file.
    #[error("converter produced no output at {0}")]
    MissingOutput(String),

    /// The output is not a complete PDF document.
    #[error("converter output is not a valid PDF: {0}")]
    InvalidOutput(String),

    /// Temp file I/O failed.
    #[error("conversion I/O error: {0}")]
    Io(String),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |code| format!("code {code}"))
}

impl ConversionError {
    /// Create a non-zero exit error.
    #[must_use]
    pub fn failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create an invalid output error.
    #[must_use]
    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self::InvalidOutput(msg.into())
    }

    /// Captured stderr, if the converter ran and failed.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
