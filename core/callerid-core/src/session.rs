//! Durable directory session.
//!
//! The CRUD layer saves the session after login; the background task has no
//! warm process state and re-reads it on every invocation. Absent or corrupt
//! files read as "no session" so the directory query falls back to the
//! anonymous key.

use std::path::PathBuf;

use crate::error::{CallerIdError, Result};
use crate::storage::{write_atomic, StorageConfig};
use crate::types::Session;

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_storage(storage: &StorageConfig) -> Self {
        Self::new(storage.session_file())
    }

    pub fn load(&self) -> Option<Session> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read stored session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&content) {
            Ok(session) if !session.access_token.trim().is_empty() => Some(session),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to parse stored session");
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let payload = serde_json::to_vec_pretty(session)
            .map_err(|err| CallerIdError::json("serialize session", err))?;
        write_atomic(&self.path, &payload)
    }

    pub fn clear(&self) -> Result<()> {
        match fs_err::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CallerIdError::io("remove session", err)),
        }
    }
}
