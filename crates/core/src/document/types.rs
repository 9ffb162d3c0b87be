//! Document types and data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review status of an ingested document.
///
/// Persisted as the Spanish label the compliance reviewers work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Awaiting review. Every new document starts here.
    #[default]
    #[serde(rename = "pendiente de revisión")]
    PendingReview,
    /// Accepted by a reviewer.
    #[serde(rename = "aprobado")]
    Approved,
    /// Rejected by a reviewer.
    #[serde(rename = "rechazado")]
    Rejected,
}

impl DocumentStatus {
    /// Convert to database string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pendiente de revisión",
            Self::Approved => "aprobado",
            Self::Rejected => "rechazado",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pendiente de revisión" => Some(Self::PendingReview),
            "aprobado" => Some(Self::Approved),
            "rechazado" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Input for recording a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    /// Name the client uploaded the file under.
    pub original_name: String,
    /// Content type of the stored object.
    pub content_type: String,
    /// Public URL of the stored object.
    pub url: String,
    /// Object key in the bucket.
    pub storage_key: String,
    /// Provider file ID, needed to delete the object version.
    pub file_id: String,
    /// Lowercase hex SHA-1 of the stored bytes.
    pub content_sha1: String,
    /// Stored size in bytes.
    pub size: u64,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Uploader user ID.
    pub uploader_uid: String,
    /// Uploader email.
    pub uploader_email: String,
    /// Company of a non-privileged uploader.
    pub company_id: Option<String>,
    /// Initial review status.
    pub estado: DocumentStatus,
}
