//! Durable contact snapshot used as the fast path of caller resolution.
//!
//! The snapshot is a JSON array stored under a fixed key
//! (`contacts-cache.json`), most-recently-touched first, unique by `id`.
//!
//! # Writers
//!
//! - The CRUD layer replaces it after an authoritative roster fetch and patches
//!   it on add/edit/delete.
//! - The resolution pipeline upserts directory hits (self-heal).
//!
//! Both execution contexts read-modify-write the same file without a lock.
//! Upserts are idempotent, so the last writer winning is acceptable.
//!
//! # Defensive Reads
//!
//! A missing, empty, or corrupt file reads as an empty snapshot. The cache is a
//! best-effort accelerator, never the source of truth.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CallerIdError, Result};
use crate::native_sink::NativeSink;
use crate::normalize::normalize;
use crate::storage::{write_atomic, StorageConfig};
use crate::types::Contact;

#[derive(Clone)]
pub struct ContactCache {
    path: PathBuf,
    sink: Option<Arc<dyn NativeSink>>,
}

impl std::fmt::Debug for ContactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactCache")
            .field("path", &self.path)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl ContactCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path, sink: None }
    }

    pub fn for_storage(storage: &StorageConfig) -> Self {
        Self::new(storage.contacts_cache_file())
    }

    /// Mirrors every mutation into `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn NativeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the last persisted snapshot, or empty on any read failure.
    pub fn get_all(&self) -> Vec<Contact> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read contact cache; treating as empty");
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<Contact>>(&content) {
            Ok(contacts) => contacts,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to parse contact cache; treating as empty");
                Vec::new()
            }
        }
    }

    /// Persists a full snapshot, overwriting the previous one.
    ///
    /// Later duplicates of an `id` are dropped so the snapshot stays unique.
    pub fn replace_all(&self, contacts: Vec<Contact>) -> Result<()> {
        let mut seen = HashSet::new();
        let unique: Vec<Contact> = contacts
            .into_iter()
            .filter(|contact| seen.insert(contact.id.clone()))
            .collect();
        self.persist(&unique)
    }

    /// Removes any entry with the same `id` and prepends `contact`.
    pub fn upsert(&self, contact: Contact) -> Result<()> {
        let mut contacts = self.get_all();
        contacts.retain(|existing| existing.id != contact.id);
        contacts.insert(0, contact);
        self.persist(&contacts)
    }

    /// Drops the entry with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut contacts = self.get_all();
        let before = contacts.len();
        contacts.retain(|existing| existing.id != id);
        if contacts.len() == before {
            return Ok(false);
        }
        self.persist(&contacts)?;
        Ok(true)
    }

    /// Linear scan for a contact whose phone normalizes to `digits`.
    pub fn find_by_digits(&self, digits: &str) -> Option<Contact> {
        if digits.is_empty() {
            return None;
        }
        self.get_all()
            .into_iter()
            .find(|contact| normalize(&contact.phone).digits == digits)
    }

    fn persist(&self, contacts: &[Contact]) -> Result<()> {
        let payload = serde_json::to_vec(contacts)
            .map_err(|err| CallerIdError::json("serialize contact cache", err))?;
        write_atomic(&self.path, &payload)?;
        self.mirror(contacts);
        Ok(())
    }

    fn mirror(&self, contacts: &[Contact]) {
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.sync_contacts(contacts) {
                tracing::warn!(error = %err, "Failed to mirror contacts to native sink");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native_sink::FileNativeSink;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        snapshots: Mutex<Vec<usize>>,
    }

    impl NativeSink for RecordingSink {
        fn sync_contacts(&self, contacts: &[Contact]) -> Result<()> {
            self.snapshots.lock().unwrap().push(contacts.len());
            Ok(())
        }
    }

    struct FailingSink;

    impl NativeSink for FailingSink {
        fn sync_contacts(&self, _contacts: &[Contact]) -> Result<()> {
            Err(CallerIdError::NativeSink("bridge unavailable".to_string()))
        }
    }

    fn cache_in(temp: &TempDir) -> ContactCache {
        ContactCache::new(temp.path().join("contacts-cache.json"))
    }

    #[test]
    fn missing_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        assert!(cache_in(&temp).get_all().is_empty());
    }

    #[test]
    fn corrupt_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);
        fs_err::write(cache.path(), "{not json").unwrap();
        assert!(cache.get_all().is_empty());
    }

    #[test]
    fn empty_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);
        fs_err::write(cache.path(), "  \n").unwrap();
        assert!(cache.get_all().is_empty());
    }

    #[test]
    fn upsert_prepends_and_replaces_same_id() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);
        cache
            .replace_all(vec![
                Contact::new("a", "Ahn", "010-0000-0001"),
                Contact::new("b", "Baek", "010-0000-0002"),
            ])
            .unwrap();

        cache
            .upsert(Contact::new("b", "Baek Renamed", "010-0000-0002"))
            .unwrap();

        let all = cache.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "b");
        assert_eq!(all[0].name, "Baek Renamed");
        assert_eq!(all[1].id, "a");
    }

    #[test]
    fn upsert_then_find_always_hits() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);

        for size in [0usize, 1, 50] {
            let roster = (0..size)
                .map(|i| Contact::new(&format!("id-{i}"), "Other", &format!("010-5555-{i:04}")))
                .collect();
            cache.replace_all(roster).unwrap();

            cache
                .upsert(Contact::new("target", "Lee", "010-9999-0000"))
                .unwrap();
            cache
                .upsert(Contact::new("target", "Lee", "010-9999-0000"))
                .unwrap();

            let hit = cache.find_by_digits("01099990000").expect("hit");
            assert_eq!(hit.id, "target");
            let count = cache
                .get_all()
                .iter()
                .filter(|c| c.id == "target")
                .count();
            assert_eq!(count, 1, "size = {size}");
        }
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);
        cache
            .replace_all(vec![
                Contact::new("a", "First", "010-0000-0001"),
                Contact::new("a", "Second", "010-0000-0001"),
            ])
            .unwrap();

        let all = cache.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "First");
    }

    #[test]
    fn remove_reports_whether_entry_existed() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);
        cache
            .upsert(Contact::new("a", "Ahn", "010-0000-0001"))
            .unwrap();

        assert!(cache.remove("a").unwrap());
        assert!(!cache.remove("a").unwrap());
        assert!(cache.get_all().is_empty());
    }

    #[test]
    fn find_by_digits_matches_any_stored_format() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp);
        cache
            .replace_all(vec![Contact::new("c1", "Kim", "010-1234-5678")])
            .unwrap();

        assert_eq!(cache.find_by_digits("01012345678").unwrap().name, "Kim");
        assert!(cache.find_by_digits("01012345679").is_none());
        assert!(cache.find_by_digits("").is_none());
    }

    #[test]
    fn mutations_are_mirrored() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let cache = cache_in(&temp).with_sink(sink.clone());

        cache
            .replace_all(vec![Contact::new("a", "Ahn", "010")])
            .unwrap();
        cache.upsert(Contact::new("b", "Baek", "011")).unwrap();
        cache.remove("a").unwrap();
        cache.remove("missing").unwrap();

        assert_eq!(*sink.snapshots.lock().unwrap(), vec![1, 2, 1]);
    }

    #[test]
    fn sink_failure_does_not_fail_write() {
        let temp = TempDir::new().unwrap();
        let cache = cache_in(&temp).with_sink(Arc::new(FailingSink));

        cache.upsert(Contact::new("a", "Ahn", "010")).unwrap();
        assert_eq!(cache.get_all().len(), 1);
    }

    #[test]
    fn file_sink_receives_snapshot() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        let cache = ContactCache::for_storage(&storage)
            .with_sink(Arc::new(FileNativeSink::for_storage(&storage)));

        cache.upsert(Contact::new("a", "Ahn", "010")).unwrap();

        assert!(storage.native_contacts_file().exists());
    }
}
