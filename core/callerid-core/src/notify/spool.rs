//! File-backed notification slots.
//!
//! Each notification id maps to `<dir>/<id>.json`. Displaying overwrites the
//! file, cancelling deletes it. The platform shell watches the directory and
//! renders whatever is there, which gives both execution contexts the same
//! last-writer-wins slot without any shared memory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{NotificationRequest, Notifier};
use crate::error::{CallerIdError, Result};
use crate::storage::{write_atomic, StorageConfig};

#[derive(Debug, Clone)]
pub struct SpoolNotifier {
    dir: PathBuf,
}

impl SpoolNotifier {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn for_storage(storage: &StorageConfig) -> Self {
        Self::new(storage.notifications_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Reads back the request currently occupying slot `id`.
    pub fn read_slot(&self, id: &str) -> Option<NotificationRequest> {
        let content = fs_err::read_to_string(self.slot_path(id)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[async_trait]
impl Notifier for SpoolNotifier {
    async fn display(&self, request: &NotificationRequest) -> Result<()> {
        let payload = serde_json::to_vec_pretty(request)
            .map_err(|err| CallerIdError::json("serialize notification", err))?;
        write_atomic(&self.slot_path(&request.id), &payload)
            .map_err(|err| CallerIdError::Notification(err.to_string()))
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        match fs_err::remove_file(self.slot_path(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CallerIdError::Notification(err.to_string())),
        }
    }
}
