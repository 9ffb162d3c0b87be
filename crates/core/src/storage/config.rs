//! Storage configuration types.

use std::time::Duration;

use dossier_shared::StorageSettings;

/// Retry behaviour for the upload round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff in milliseconds.
    pub backoff_ms: u64,
    /// Multiplier applied per attempt.
    pub backoff_factor: u64,
    /// Upper bound for a single backoff in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 200,
            backoff_factor: 2,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 0,
            backoff_factor: 1,
            max_backoff_ms: 0,
        }
    }

    /// Backoff before retry number `attempt` (zero-based):
    /// `backoff_ms * backoff_factor ^ attempt`, capped at `max_backoff_ms`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .backoff_ms
            .saturating_mul(self.backoff_factor.saturating_pow(attempt));
        Duration::from_millis(exponential.min(self.max_backoff_ms))
    }
}

/// Storage client configuration.
#[derive(Clone)]
pub struct StorageConfig {
    /// Application key ID.
    pub key_id: String,
    /// Application key secret.
    pub application_key: String,
    /// Bucket name used in public URLs.
    pub bucket_name: String,
    /// Explicit bucket ID; falls back to the key's allowed bucket.
    pub bucket_id: Option<String>,
    /// Base URL of the authorization endpoint.
    pub auth_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retry policy for uploads.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("key_id", &self.key_id)
            .field("application_key", &"[hidden]")
            .field("bucket_name", &self.bucket_name)
            .field("bucket_id", &self.bucket_id)
            .field("auth_url", &self.auth_url)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl StorageConfig {
    /// Default authorization endpoint.
    pub const DEFAULT_AUTH_URL: &'static str = "https://api.backblazeb2.com";
    /// Default per-request timeout: 30 seconds.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(
        key_id: impl Into<String>,
        application_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            application_key: application_key.into(),
            bucket_name: bucket_name.into(),
            bucket_id: None,
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Build from the deserialized application settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            key_id: settings.key_id.clone(),
            application_key: settings.application_key.clone(),
            bucket_name: settings.bucket_name.clone(),
            bucket_id: settings.bucket_id.clone(),
            auth_url: settings.auth_url.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                backoff_ms: settings.backoff_ms,
                backoff_factor: settings.backoff_factor,
                max_backoff_ms: settings.max_backoff_ms,
            },
        }
    }

    /// Set the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set an explicit bucket ID.
    #[must_use]
    pub fn with_bucket_id(mut self, bucket_id: impl Into<String>) -> Self {
        self.bucket_id = Some(bucket_id.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
