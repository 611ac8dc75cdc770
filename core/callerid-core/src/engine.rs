//! CallerIdEngine - FFI entry point for the host app's contact screens.
//!
//! The host's CRUD flows go through here so the cache (and its native mirror)
//! stays in step with what the user sees. Event handling lives in
//! [`crate::foreground`] and [`crate::background`], not on this object.
//!
//! ```rust,ignore
//! use callerid_core::CallerIdEngine;
//!
//! let engine = CallerIdEngine::new()?;
//! engine.upsert_contact(contact)?;
//! let hit = engine.find_contact("010-1234-5678".into());
//! ```

use std::sync::Arc;

use crate::cache::ContactCache;
use crate::error::CallerIdFfiError;
use crate::native_sink::FileNativeSink;
use crate::normalize::normalize;
use crate::session::SessionStore;
use crate::storage::StorageConfig;
use crate::types::{Contact, Session};

#[derive(uniffi::Object)]
pub struct CallerIdEngine {
    storage: StorageConfig,
    cache: ContactCache,
    sessions: SessionStore,
}

impl CallerIdEngine {
    /// Not exposed to FFI; tests and the daemon pass their own root.
    pub fn with_storage(storage: StorageConfig) -> Self {
        let cache = ContactCache::for_storage(&storage)
            .with_sink(Arc::new(FileNativeSink::for_storage(&storage)));
        let sessions = SessionStore::for_storage(&storage);
        Self {
            storage,
            cache,
            sessions,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }
}

#[uniffi::export]
impl CallerIdEngine {
    /// Uses `~/.callerid/`, or `$CALLERID_HOME` when set.
    #[uniffi::constructor]
    pub fn new() -> Result<Self, CallerIdFfiError> {
        Ok(Self::with_storage(StorageConfig::resolve()?))
    }

    pub fn storage_root(&self) -> String {
        self.storage.root().to_string_lossy().to_string()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Contacts API
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn contacts(&self) -> Vec<Contact> {
        self.cache.get_all()
    }

    /// Replaces the whole roster, e.g. after a full sync from the directory.
    pub fn replace_contacts(&self, contacts: Vec<Contact>) -> Result<(), CallerIdFfiError> {
        self.cache.replace_all(contacts).map_err(CallerIdFfiError::from)
    }

    pub fn upsert_contact(&self, contact: Contact) -> Result<(), CallerIdFfiError> {
        self.cache.upsert(contact).map_err(CallerIdFfiError::from)
    }

    pub fn remove_contact(&self, id: String) -> Result<bool, CallerIdFfiError> {
        self.cache.remove(&id).map_err(CallerIdFfiError::from)
    }

    /// Cache-only lookup by any spelling of a phone number.
    pub fn find_contact(&self, phone: String) -> Option<Contact> {
        self.cache.find_by_digits(&normalize(&phone).digits)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Session API
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn save_session(&self, session: Session) -> Result<(), CallerIdFfiError> {
        self.sessions.save(&session).map_err(CallerIdFfiError::from)
    }

    pub fn clear_session(&self) -> Result<(), CallerIdFfiError> {
        self.sessions.clear().map_err(CallerIdFfiError::from)
    }

    pub fn has_session(&self) -> bool {
        self.sessions.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine() -> (TempDir, CallerIdEngine) {
        let temp = TempDir::new().unwrap();
        let engine = CallerIdEngine::with_storage(StorageConfig::with_root(temp.path().into()));
        (temp, engine)
    }

    #[test]
    fn crud_flows_through_cache_and_native_mirror() {
        let (_temp, engine) = engine();

        engine
            .upsert_contact(Contact::new("c1", "Kim", "010-1234-5678"))
            .unwrap();
        engine
            .upsert_contact(Contact::new("c2", "Lee", "010-9999-0000"))
            .unwrap();

        let found = engine.find_contact("+82 010 1234 5678".to_string());
        assert!(found.is_none(), "country prefix changes the digit string");

        let found = engine.find_contact("010 1234 5678".to_string()).unwrap();
        assert_eq!(found.id, "c1");

        assert!(engine.remove_contact("c1".to_string()).unwrap());
        assert!(!engine.remove_contact("c1".to_string()).unwrap());
        assert_eq!(engine.contacts().len(), 1);

        let mirrored = std::fs::read_to_string(engine.storage().native_contacts_file()).unwrap();
        let mirrored: Vec<Contact> = serde_json::from_str(&mirrored).unwrap();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].id, "c2");
    }

    #[test]
    fn session_save_and_clear() {
        let (_temp, engine) = engine();
        assert!(!engine.has_session());

        engine
            .save_session(Session {
                user_id: "agent-1".to_string(),
                email: None,
                access_token: "token".to_string(),
            })
            .unwrap();
        assert!(engine.has_session());

        engine.clear_session().unwrap();
        assert!(!engine.has_session());
        engine.clear_session().unwrap();
    }
}
