use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use super::domain::{ContactDetails, SessionId};

/// Key under which partially entered step-one data is kept.
pub const CONTACT_DRAFT_KEY: &str = "form_step1";

/// Session-scoped key/value storage for drafts that must survive a reload.
pub trait SessionStore: Send + Sync {
    fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, SessionStoreError>;
    fn set(&self, session: &SessionId, key: &str, value: String) -> Result<(), SessionStoreError>;
    fn remove(&self, session: &SessionId, key: &str) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("unable to encode draft: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<HashMap<(SessionId, String), String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, SessionStoreError> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(&(session.clone(), key.to_string())).cloned())
    }

    fn set(&self, session: &SessionId, key: &str, value: String) -> Result<(), SessionStoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert((session.clone(), key.to_string()), value);
        Ok(())
    }

    fn remove(&self, session: &SessionId, key: &str) -> Result<(), SessionStoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&(session.clone(), key.to_string()));
        Ok(())
    }
}

/// Reads the step-one draft. Corrupt JSON is logged and treated as absent.
pub fn load_contact_draft(
    store: &dyn SessionStore,
    session: &SessionId,
) -> Result<Option<ContactDetails>, SessionStoreError> {
    let Some(raw) = store.get(session, CONTACT_DRAFT_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(details) => Ok(Some(details)),
        Err(error) => {
            warn!(session = %session, %error, "discarding unreadable contact draft");
            Ok(None)
        }
    }
}

pub fn save_contact_draft(
    store: &dyn SessionStore,
    session: &SessionId,
    details: &ContactDetails,
) -> Result<(), SessionStoreError> {
    let encoded = serde_json::to_string(details)?;
    store.set(session, CONTACT_DRAFT_KEY, encoded)
}

pub fn clear_contact_draft(
    store: &dyn SessionStore,
    session: &SessionId,
) -> Result<(), SessionStoreError> {
    store.remove(session, CONTACT_DRAFT_KEY)
}
