//! Process-wide account session with single-flight initialization.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::error::StorageError;

/// Result of `b2_authorize_account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Account authorization token.
    pub auth_token: String,
    /// Base URL for API calls.
    pub api_url: String,
    /// Bucket uploads go to.
    pub bucket_id: String,
    /// Base URL for downloads.
    pub download_url: String,
}

/// Cached session slot.
///
/// The async mutex is held across the authorization call, so concurrent first
/// callers queue behind the one doing the work and then all observe its
/// result.
#[derive(Debug, Default)]
pub(crate) struct SessionCache {
    slot: Mutex<Option<Arc<AuthSession>>>,
}

impl SessionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the cached session, running `authorize` only if none exists.
    pub(crate) async fn get_or_authorize<F, Fut>(
        &self,
        authorize: F,
    ) -> Result<Arc<AuthSession>, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AuthSession, StorageError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(authorize().await?);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Drop the cached session if it is still `stale`.
    ///
    /// A caller holding an old session must not evict a fresh one another
    /// request already obtained.
    pub(crate) async fn invalidate(&self, stale: &AuthSession) -> bool {
        let mut slot = self.slot.lock().await;
        if slot
            .as_ref()
            .is_some_and(|current| current.auth_token == stale.auth_token)
        {
            *slot = None;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub(crate) async fn current(&self) -> Option<Arc<AuthSession>> {
        self.slot.lock().await.clone()
    }
}
