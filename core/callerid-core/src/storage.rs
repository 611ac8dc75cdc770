//! Storage configuration and path management for callerid.
//!
//! Every durable artifact the pipeline touches lives under one root so that the
//! foreground listener and the background task, which share no memory, agree on
//! where the cache, session, and notification slot are.
//!
//! Production code uses [`StorageConfig::resolve`] (honours `CALLERID_HOME`,
//! falls back to `~/.callerid`). Tests use [`StorageConfig::with_root`].

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{CallerIdError, Result};

pub const HOME_ENV: &str = "CALLERID_HOME";

/// Fixed storage key of the contact snapshot.
pub const CONTACTS_CACHE_KEY: &str = "contacts-cache";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the storage root from `CALLERID_HOME` or the home directory.
    pub fn resolve() -> Result<Self> {
        if let Ok(root) = env::var(HOME_ENV) {
            if !root.trim().is_empty() {
                return Ok(Self::with_root(PathBuf::from(root)));
            }
        }
        let home = dirs::home_dir().ok_or(CallerIdError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(".callerid")))
    }

    /// Creates a StorageConfig with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to the contact snapshot (the cache's fixed storage key).
    pub fn contacts_cache_file(&self) -> PathBuf {
        self.root.join(format!("{}.json", CONTACTS_CACHE_KEY))
    }

    /// Path to the mirror read by native call-handling code.
    pub fn native_contacts_file(&self) -> PathBuf {
        self.root.join("native-contacts.json")
    }

    /// Path to the persisted directory session.
    pub fn session_file(&self) -> PathBuf {
        self.root.join("session.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn socket_file(&self) -> PathBuf {
        self.root.join("daemon.sock")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    /// Directory holding one file per notification slot.
    pub fn notifications_dir(&self) -> PathBuf {
        self.root.join("notifications")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)?;
        fs_err::create_dir_all(self.notifications_dir())?;
        fs_err::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

/// Writes `content` to `path` via temp file + rename so that a reader in the
/// other execution context never observes a partial file.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent_dir = path.parent().ok_or_else(|| {
        CallerIdError::io(
            format!("{} has no parent directory", path.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        )
    })?;
    fs_err::create_dir_all(parent_dir)
        .map_err(|err| CallerIdError::io("create storage directory", err))?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .map_err(|err| CallerIdError::io("create temp file", err))?;
    temp_file
        .write_all(content)
        .map_err(|err| CallerIdError::io("write temp file", err))?;
    temp_file
        .flush()
        .map_err(|err| CallerIdError::io("flush temp file", err))?;
    temp_file
        .persist(path)
        .map_err(|err| CallerIdError::io(format!("persist {}", path.display()), err.error))?;
    Ok(())
}
