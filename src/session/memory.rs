use std::sync::Mutex;

use async_trait::async_trait;

use super::{Session, SessionStore, StoreResult};

/// Process-local store; the session is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> StoreResult<Option<Session>> {
        Ok(self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    async fn save(&self, session: &Session) -> StoreResult<()> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).take();
        Ok(())
    }
}
