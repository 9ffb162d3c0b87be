//! Storage client implementation over the B2 native API.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use super::config::StorageConfig;
use super::error::StorageError;
use super::key::{
    content_sha1, encode_header_value, generate_object_key, is_valid_sha1, resolve_sha1,
};
use super::session::{AuthSession, SessionCache};

const API_PREFIX: &str = "/b2api/v2";

/// Request to store one object.
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Raw payload.
    pub bytes: Bytes,
    /// Content type recorded with the object.
    pub content_type: String,
    /// Key prefix.
    pub folder: String,
    /// Name the client uploaded the file under.
    pub original_name: String,
    /// Caller-computed SHA-1; recomputed when absent or malformed.
    pub sha1: Option<String>,
}

/// An object durably stored in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Object key (B2 file name).
    pub key: String,
    /// Provider file ID.
    pub file_id: String,
    /// Lowercase hex SHA-1 of the stored bytes.
    pub content_sha1: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type.
    pub content_type: String,
    /// Public download URL.
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    authorization_token: String,
    api_url: String,
    download_url: String,
    #[serde(default)]
    allowed: Option<AllowedScope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllowedScope {
    #[serde(default)]
    bucket_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadTarget {
    upload_url: String,
    authorization_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    file_id: String,
    #[serde(default)]
    content_sha1: Option<String>,
}

/// Object store client with a cached account session.
pub struct StorageClient {
    http: Client,
    config: StorageConfig,
    session: SessionCache,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Create a new storage client from configuration.
    ///
    /// No network call happens here; the session is authorized on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::configuration(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session: SessionCache::new(),
        })
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        &self.config.bucket_name
    }

    /// Return the account session, authorizing it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be authorized.
    pub async fn ensure_session(&self) -> Result<Arc<AuthSession>, StorageError> {
        self.session
            .get_or_authorize(|| self.authorize_account())
            .await
    }

    async fn authorize_account(&self) -> Result<AuthSession, StorageError> {
        let url = format!(
            "{}{API_PREFIX}/b2_authorize_account",
            self.config.auth_url.trim_end_matches('/')
        );
        debug!(url = %url, "Authorizing object store account");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.application_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::authorization(status.as_u16(), &body));
        }

        let body: AuthorizeAccountResponse = response.json().await?;
        let bucket_id = self
            .config
            .bucket_id
            .clone()
            .or_else(|| body.allowed.and_then(|allowed| allowed.bucket_id))
            .ok_or_else(|| {
                StorageError::configuration(
                    "no bucket id configured and the key is not restricted to a bucket",
                )
            })?;

        info!(api_url = %body.api_url, bucket_id = %bucket_id, "Object store session authorized");

        Ok(AuthSession {
            auth_token: body.authorization_token,
            api_url: body.api_url,
            bucket_id,
            download_url: body.download_url,
        })
    }

    /// Store bytes under a freshly generated key.
    ///
    /// The key is generated once, so retried attempts overwrite nothing else.
    /// Each attempt requests a new single-use upload URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the upload after retries, or
    /// reports a hash that differs from the one sent.
    pub async fn put(&self, request: PutRequest) -> Result<StoredObject, StorageError> {
        let sha1 = resolve_sha1(request.sha1.as_deref(), &request.bytes);
        let key = generate_object_key(
            &request.folder,
            &request.content_type,
            Utc::now().timestamp_millis(),
        );
        let retry = self.config.retry;

        let mut attempt = 0;
        let mut auth_retried = false;
        let (uploaded, session) = loop {
            match self.try_upload(&key, &sha1, &request).await {
                Ok(done) => break done,
                // One free retry on 401. A rejected account token has already
                // been invalidated in `try_upload`; a rejected upload token only
                // needs the fresh upload URL the next attempt fetches.
                Err(err) if err.is_auth_rejection() && !auth_retried => {
                    auth_retried = true;
                    warn!(key = %key, error = %err, "Provider rejected credentials, retrying");
                }
                Err(err) if err.is_retryable() && attempt < retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        key = %key,
                        attempt,
                        backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Upload attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        };

        if let Some(reported) = uploaded
            .content_sha1
            .as_deref()
            .filter(|hash| is_valid_sha1(hash))
            && reported != sha1
        {
            return Err(StorageError::IntegrityMismatch {
                expected: sha1,
                actual: reported.to_string(),
            });
        }

        let url = public_url(&session.download_url, &self.config.bucket_name, &key)?;
        let stored = StoredObject {
            key,
            file_id: uploaded.file_id,
            content_sha1: sha1,
            size: u64::try_from(request.bytes.len()).unwrap_or(u64::MAX),
            content_type: request.content_type,
            url,
        };

        info!(
            key = %stored.key,
            file_id = %stored.file_id,
            size = stored.size,
            content_type = %stored.content_type,
            "Object stored"
        );

        Ok(stored)
    }

    async fn try_upload(
        &self,
        key: &str,
        sha1: &str,
        request: &PutRequest,
    ) -> Result<(UploadedFile, Arc<AuthSession>), StorageError> {
        let session = self.ensure_session().await?;

        let target = match self.get_upload_url(&session).await {
            Ok(target) => target,
            Err(err) => {
                if err.is_auth_rejection() {
                    self.session.invalidate(&session).await;
                }
                return Err(err);
            }
        };

        let response = self
            .http
            .post(&target.upload_url)
            .header(AUTHORIZATION, &target.authorization_token)
            .header("X-Bz-File-Name", encode_header_value(key))
            .header(CONTENT_TYPE, &request.content_type)
            .header("X-Bz-Content-Sha1", sha1)
            .header(
                "X-Bz-Info-original_filename",
                encode_header_value(&request.original_name),
            )
            .body(request.bytes.clone())
            .send()
            .await?;

        let uploaded: UploadedFile = ensure_success(response).await?.json().await?;
        Ok((uploaded, session))
    }

    async fn get_upload_url(&self, session: &AuthSession) -> Result<UploadTarget, StorageError> {
        let url = format!(
            "{}{API_PREFIX}/b2_get_upload_url",
            session.api_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, &session.auth_token)
            .json(&json!({ "bucketId": session.bucket_id }))
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// Delete a stored object version.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses the deletion.
    pub async fn delete(&self, stored: &StoredObject) -> Result<(), StorageError> {
        let mut auth_retried = false;
        loop {
            let session = self.ensure_session().await?;
            let url = format!(
                "{}{API_PREFIX}/b2_delete_file_version",
                session.api_url.trim_end_matches('/')
            );

            let response = self
                .http
                .post(&url)
                .header(AUTHORIZATION, &session.auth_token)
                .json(&json!({ "fileName": stored.key, "fileId": stored.file_id }))
                .send()
                .await?;

            match ensure_success(response).await {
                Ok(_) => {
                    info!(key = %stored.key, file_id = %stored.file_id, "Object deleted");
                    return Ok(());
                }
                Err(err) if err.is_auth_rejection() && !auth_retried => {
                    auth_retried = true;
                    self.session.invalidate(&session).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Download a stored object and verify its content hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails or the bytes do not hash to
    /// `stored.content_sha1`.
    pub async fn fetch(&self, stored: &StoredObject) -> Result<Bytes, StorageError> {
        let session = self.ensure_session().await?;
        let url = format!(
            "{}/file/{}/{}",
            session.download_url.trim_end_matches('/'),
            encode_header_value(&self.config.bucket_name),
            encode_header_value(&stored.key)
        );

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, &session.auth_token)
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?;

        let actual = content_sha1(&bytes);
        if actual != stored.content_sha1 {
            return Err(StorageError::IntegrityMismatch {
                expected: stored.content_sha1.clone(),
                actual,
            });
        }

        Ok(bytes)
    }
}

/// Turn a non-2xx response into a provider error.
async fn ensure_success(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::provider(status.as_u16(), &body))
}

/// `https://{host-from-downloadUrl}/file/{bucketName}/{key}`.
fn public_url(download_url: &str, bucket_name: &str, key: &str) -> Result<String, StorageError> {
    let parsed = Url::parse(download_url)
        .map_err(|e| StorageError::decode(format!("invalid downloadUrl {download_url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| StorageError::decode(format!("downloadUrl has no host: {download_url}")))?;
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(format!(
        "https://{authority}/file/{}/{}",
        encode_header_value(bucket_name),
        encode_header_value(key)
    ))
}
