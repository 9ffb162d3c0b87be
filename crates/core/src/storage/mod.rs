//! Object storage client speaking the B2 native REST protocol.
//!
//! One [`StorageClient`] is built at process start and shared by every
//! request. It owns the account session, which is authorized lazily and
//! exactly once no matter how many requests race to use it first.
//!
//! # Protocol
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ 1. GET  {authUrl}/b2api/v2/b2_authorize_account   (Basic auth)   │
//! │         → apiUrl, authorizationToken, downloadUrl, bucketId      │
//! │ 2. POST {apiUrl}/b2api/v2/b2_get_upload_url       (per upload)   │
//! │         → uploadUrl, upload authorizationToken (single use)      │
//! │ 3. POST {uploadUrl}  X-Bz-File-Name, X-Bz-Content-Sha1, ...      │
//! │         → fileId                                                 │
//! │ 4. https://{downloadHost}/file/{bucketName}/{key}                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod client;
mod config;
mod error;
mod key;
mod session;


pub use client::{PutRequest, StorageClient, StoredObject};
pub use config::{RetryPolicy, StorageConfig};
pub use error::StorageError;
pub use key::{content_sha1, extension_for, generate_object_key, is_valid_sha1, resolve_sha1};
pub use session::AuthSession;
