mod common;

use std::sync::Arc;
use std::time::Duration;

use callerid_core::background::{BackgroundTask, TaskOutcome};
use callerid_core::cache::ContactCache;
use callerid_core::lookup::{LookupSource, ResolveOutcome};
use callerid_core::native_sink::FileNativeSink;
use callerid_core::notify::{SpoolNotifier, INCOMING_CALL_NOTIFICATION_ID};
use callerid_core::session::SessionStore;
use callerid_core::storage::StorageConfig;
use callerid_core::types::{Contact, Session};
use callerid_core::{CallEvent, TaskPayload};
use common::{kim, lee, FakeConnector, FakeDirectory};
use tempfile::TempDir;

fn storage() -> (TempDir, StorageConfig) {
    let temp = TempDir::new().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    (temp, storage)
}

fn task(storage: &StorageConfig, connector: Arc<FakeConnector>) -> BackgroundTask {
    BackgroundTask::new(
        storage.clone(),
        connector,
        Arc::new(SpoolNotifier::for_storage(storage)),
        Duration::from_secs(1),
    )
}

#[tokio::test]
async fn test_cache_hit_writes_notification_slot() {
    let (_temp, storage) = storage();
    ContactCache::for_storage(&storage)
        .replace_all(vec![kim()])
        .unwrap();
    let connector = Arc::new(FakeConnector::unconfigured());

    let outcome = task(&storage, connector.clone())
        .run(TaskPayload::incoming("010-1234-5678"))
        .await;

    assert_eq!(
        outcome,
        TaskOutcome::Resolved(ResolveOutcome::Presented {
            client_id: "c1".to_string(),
            source: LookupSource::Cache,
        })
    );
    assert!(connector.sessions().is_empty(), "no directory on a cache hit");

    let slot = SpoolNotifier::for_storage(&storage)
        .read_slot(INCOMING_CALL_NOTIFICATION_ID)
        .expect("alert written");
    assert_eq!(slot.title, "📞 Kim");
}

#[tokio::test]
async fn test_each_run_reads_stored_session() {
    let (_temp, storage) = storage();
    SessionStore::for_storage(&storage)
        .save(&Session {
            user_id: "agent-1".to_string(),
            email: Some("agent@example.com".to_string()),
            access_token: "token".to_string(),
        })
        .unwrap();
    let directory = Arc::new(FakeDirectory::answering(Some(lee())));
    let connector = Arc::new(FakeConnector::with(directory.clone()));
    let task = task(&storage, connector.clone())
        .with_native_sink(Arc::new(FileNativeSink::for_storage(&storage)));

    let outcome = task.run(TaskPayload::incoming("01099990000")).await;

    assert_eq!(
        outcome,
        TaskOutcome::Resolved(ResolveOutcome::Presented {
            client_id: "c2".to_string(),
            source: LookupSource::Directory,
        })
    );
    let sessions = connector.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].as_ref().map(|s| s.user_id.as_str()), Some("agent-1"));

    let healed = ContactCache::for_storage(&storage)
        .find_by_digits("01099990000")
        .expect("self-healed");
    assert_eq!(healed.id, "c2");

    let mirrored = std::fs::read_to_string(storage.native_contacts_file()).unwrap();
    let mirrored: Vec<Contact> = serde_json::from_str(&mirrored).unwrap();
    assert_eq!(mirrored.len(), 1);

    // Second broadcast resolves from the healed cache.
    let again = task.run(TaskPayload::incoming("01099990000")).await;
    assert!(matches!(
        again,
        TaskOutcome::Resolved(ResolveOutcome::Presented {
            source: LookupSource::Cache,
            ..
        })
    ));
    assert_eq!(directory.calls(), 1);
}

#[tokio::test]
async fn test_unconfigured_directory_is_a_miss() {
    let (_temp, storage) = storage();
    let connector = Arc::new(FakeConnector::unconfigured());

    let outcome = task(&storage, connector.clone())
        .run(TaskPayload::incoming("01099990000"))
        .await;

    assert_eq!(outcome, TaskOutcome::Resolved(ResolveOutcome::NoMatch));
    assert_eq!(connector.sessions(), vec![None]);
    assert!(SpoolNotifier::for_storage(&storage)
        .read_slot(INCOMING_CALL_NOTIFICATION_ID)
        .is_none());
}

#[tokio::test]
async fn test_ended_broadcast_clears_alert() {
    let (_temp, storage) = storage();
    ContactCache::for_storage(&storage)
        .replace_all(vec![kim()])
        .unwrap();
    let task = task(&storage, Arc::new(FakeConnector::unconfigured()));

    task.run(TaskPayload::incoming("01012345678")).await;
    let outcome = task
        .run(TaskPayload::new(CallEvent::Rejected, None))
        .await;

    assert_eq!(outcome, TaskOutcome::Cleared);
    assert!(SpoolNotifier::for_storage(&storage)
        .read_slot(INCOMING_CALL_NOTIFICATION_ID)
        .is_none());
}

#[tokio::test]
async fn test_incoming_without_number_is_skipped() {
    let (_temp, storage) = storage();
    let outcome = task(&storage, Arc::new(FakeConnector::unconfigured()))
        .run(TaskPayload::new(CallEvent::Incoming, Some("   ")))
        .await;

    assert_eq!(outcome, TaskOutcome::Skipped);
}
