//! Headless resolution for when no foreground process is alive.
//!
//! The host wakes a short-lived process per telephony broadcast and hands it a
//! [`TaskPayload`]. Nothing survives between runs: every invocation reopens the
//! cache, re-reads the stored session and connects a fresh directory client.
//!
//! There is no call-state veto here and no debounce. A burst of `incoming`
//! broadcasts for one ring runs the pipeline once per broadcast; the alert uses
//! a fixed id, so the user still sees a single notification.

use std::sync::Arc;
use std::time::Duration;

use callerid_protocol::{CallEvent, TaskPayload};
use tracing::Instrument;

use crate::cache::ContactCache;
use crate::directory::DirectoryConnector;
use crate::lookup::{lookup_cached, query_directory, self_heal, LookupSource, ResolveOutcome};
use crate::native_sink::NativeSink;
use crate::normalize::normalize;
use crate::notify::{NotificationPresenter, Notifier};
use crate::session::SessionStore;
use crate::storage::StorageConfig;

/// What one headless invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Resolved(ResolveOutcome),
    /// An ended/offhook broadcast cleared the alert.
    Cleared,
    /// Incoming without a number.
    Skipped,
}

pub struct BackgroundTask {
    storage: StorageConfig,
    connector: Arc<dyn DirectoryConnector>,
    presenter: NotificationPresenter,
    native_sink: Option<Arc<dyn NativeSink>>,
    lookup_timeout: Duration,
}

impl BackgroundTask {
    pub fn new(
        storage: StorageConfig,
        connector: Arc<dyn DirectoryConnector>,
        notifier: Arc<dyn Notifier>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            connector,
            presenter: NotificationPresenter::new(notifier),
            native_sink: None,
            lookup_timeout,
        }
    }

    /// Mirrors self-healed rows to the native store as well.
    pub fn with_native_sink(mut self, sink: Arc<dyn NativeSink>) -> Self {
        self.native_sink = Some(sink);
        self
    }

    pub async fn run(&self, payload: TaskPayload) -> TaskOutcome {
        let invocation = ulid::Ulid::new().to_string();
        let span = tracing::info_span!("background_task", invocation = %invocation);
        self.handle(payload).instrument(span).await
    }

    async fn handle(&self, payload: TaskPayload) -> TaskOutcome {
        tracing::info!(event = %payload.event, "Background task started");

        match payload.event {
            CallEvent::Incoming => match payload.number() {
                Some(number) => TaskOutcome::Resolved(self.resolve(number).await),
                None => {
                    tracing::debug!("Incoming broadcast without a number");
                    TaskOutcome::Skipped
                }
            },
            CallEvent::Offhook
            | CallEvent::Disconnected
            | CallEvent::Missed
            | CallEvent::IncomingEnded
            | CallEvent::Rejected => {
                self.presenter.cancel().await;
                TaskOutcome::Cleared
            }
        }
    }

    fn open_cache(&self) -> ContactCache {
        let cache = ContactCache::for_storage(&self.storage);
        match &self.native_sink {
            Some(sink) => cache.with_sink(Arc::clone(sink)),
            None => cache,
        }
    }

    async fn resolve(&self, raw: &str) -> ResolveOutcome {
        let number = normalize(raw);
        if !number.is_matchable() {
            return ResolveOutcome::Unmatchable;
        }

        let cache = self.open_cache();
        if let Some(contact) = lookup_cached(&cache, &number) {
            self.presenter.present(&contact).await;
            return ResolveOutcome::Presented {
                client_id: contact.id,
                source: LookupSource::Cache,
            };
        }

        let session = SessionStore::for_storage(&self.storage).load();
        let directory = match self.connector.connect(session) {
            Ok(directory) => directory,
            Err(err) => {
                tracing::warn!(error = %err, "No directory available; treating as miss");
                return ResolveOutcome::NoMatch;
            }
        };

        let contact =
            match query_directory(directory.as_ref(), &number, raw, self.lookup_timeout).await {
                Some(contact) => contact,
                None => return ResolveOutcome::NoMatch,
            };

        self.presenter.present(&contact).await;
        self_heal(&cache, &contact);
        ResolveOutcome::Presented {
            client_id: contact.id,
            source: LookupSource::Directory,
        }
    }
}
