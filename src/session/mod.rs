//! Client-side session: the token pair plus the cached profile, behind an
//! injectable persistence capability.

mod file;
mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::auth::token_fingerprint;
use crate::models::UserProfile;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            user: None,
        }
    }
}

// Tokens never reach logs verbatim.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &token_fingerprint(&self.access_token))
            .field("refresh_token", &token_fingerprint(&self.refresh_token))
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, SessionStoreError>;

/// Read/write/clear over wherever the session lives.
///
/// Implementations hold at most one session; `save` replaces it wholesale.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> StoreResult<Option<Session>>;

    async fn save(&self, session: &Session) -> StoreResult<()>;

    async fn clear(&self) -> StoreResult<()>;
}

/// Shared handle the client and its middleware use to reach the session.
///
/// Every write holds `writes`, so a read-modify-write such as
/// `cache_profile` can't interleave with `clear` and bring a cleared
/// session back.
#[derive(Clone)]
pub struct SessionHandle {
    store: Arc<dyn SessionStore>,
    writes: Arc<Mutex<()>>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::default()))
    }

    pub async fn current(&self) -> StoreResult<Option<Session>> {
        self.store.load().await
    }

    pub async fn access_token(&self) -> StoreResult<Option<String>> {
        Ok(self.store.load().await?.map(|s| s.access_token))
    }

    pub async fn profile(&self) -> StoreResult<Option<UserProfile>> {
        Ok(self.store.load().await?.and_then(|s| s.user))
    }

    /// Start a fresh session from a login; any cached profile is dropped.
    pub async fn begin(&self, access_token: String, refresh_token: String) -> StoreResult<()> {
        let _write = self.writes.lock().await;
        self.store
            .save(&Session::new(access_token, refresh_token))
            .await
    }

    /// Swap in a refreshed access token. Returns `false` when there is no
    /// session to update (it was cleared in the meantime).
    pub async fn replace_access_token(&self, access_token: String) -> StoreResult<bool> {
        self.replace_tokens(access_token, None).await
    }

    /// Like `replace_access_token`, also taking a rotated refresh token when
    /// the server issued one.
    pub async fn replace_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
    ) -> StoreResult<bool> {
        let _write = self.writes.lock().await;
        let Some(mut session) = self.store.load().await? else {
            return Ok(false);
        };
        session.access_token = access_token;
        if let Some(refresh_token) = refresh_token {
            session.refresh_token = refresh_token;
        }
        self.store.save(&session).await?;
        Ok(true)
    }

    pub async fn cache_profile(&self, user: UserProfile) -> StoreResult<bool> {
        let _write = self.writes.lock().await;
        let Some(mut session) = self.store.load().await? else {
            return Ok(false);
        };
        session.user = Some(user);
        self.store.save(&session).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> StoreResult<()> {
        let _write = self.writes.lock().await;
        self.store.clear().await
    }
}
