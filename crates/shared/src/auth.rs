//! Caller identity types carried by bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role that is allowed to upload on behalf of any company.
pub const PRIVILEGED_ROLE: &str = "admin";

/// Claims carried by an identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as issued by the identity provider).
    pub sub: String,
    /// User email.
    pub email: String,
    /// User's role.
    pub role: String,
    /// Company the user belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        uid: &str,
        email: &str,
        role: &str,
        company_id: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: uid.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            company_id: company_id.map(str::to_string),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the identity described by these claims.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            company_id: self.company_id.clone(),
        }
    }
}

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User ID.
    pub uid: String,
    /// User email.
    pub email: String,
    /// User's role.
    pub role: String,
    /// Company the user belongs to, if any.
    pub company_id: Option<String>,
}

impl Identity {
    /// Whether the caller may act across companies.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.role == PRIVILEGED_ROLE
    }
}
