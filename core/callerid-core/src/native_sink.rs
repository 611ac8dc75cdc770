//! Mirror of the contact snapshot for native call-handling code.
//!
//! Native receivers on the platform side read contact data without going
//! through this pipeline. Every cache mutation is pushed here; a failed mirror
//! is logged by the cache and never reaches the caller.

use std::path::PathBuf;

use crate::error::{CallerIdError, Result};
use crate::storage::{write_atomic, StorageConfig};
use crate::types::Contact;

pub trait NativeSink: Send + Sync {
    fn sync_contacts(&self, contacts: &[Contact]) -> Result<()>;
}

/// Writes the snapshot as a JSON array to `native-contacts.json`.
#[derive(Debug, Clone)]
pub struct FileNativeSink {
    path: PathBuf,
}

impl FileNativeSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_storage(storage: &StorageConfig) -> Self {
        Self::new(storage.native_contacts_file())
    }
}

impl NativeSink for FileNativeSink {
    fn sync_contacts(&self, contacts: &[Contact]) -> Result<()> {
        let payload = serde_json::to_vec(contacts)
            .map_err(|err| CallerIdError::json("serialize native contacts", err))?;
        write_atomic(&self.path, &payload)
            .map_err(|err| CallerIdError::NativeSink(err.to_string()))
    }
}
