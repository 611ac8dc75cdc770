//! Foreground resolution service.
//!
//! Owns the process's single telephony subscription and resolves incoming
//! callers while the app is alive.
//!
//! ## State Machine
//!
//! ```text
//! Idle ──start()──▶ Attaching ──permissions + subscribe ok──▶ Listening
//!   ▲                   │                                         │
//!   └──denied/unsupported┘                        stop() / stream closed
//! ```
//!
//! ## Event Handling
//!
//! ```text
//! incoming(number) → call active; resolve on its own task unless one is running
//! offhook          → call active; cancel alert (the agent is talking)
//! ended family     → call inactive; cancel alert; clear current caller
//! ```
//!
//! Events are applied in arrival order by the listen loop. Only `resolve` runs
//! concurrently, so an `ended` event can land while a lookup is in flight;
//! every alert is therefore gated on a fresh `is_call_active` check, and
//! re-checked right after display.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use callerid_protocol::{CallEvent, TelephonyEvent};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::cache::ContactCache;
use crate::call_state::{CallStateTracker, CurrentCaller, ListenerState};
use crate::config::CallerIdConfig;
use crate::directory::Directory;
use crate::error::CallerIdError;
use crate::lookup::{lookup_cached, query_directory, self_heal, LookupSource, ResolveOutcome};
use crate::normalize::normalize;
use crate::notify::{NotificationPresenter, Notifier};
use crate::permissions::{Permission, PermissionGate};
use crate::telephony::TelephonyEventSource;
use crate::types::Contact;

#[derive(Debug, Clone)]
pub struct ForegroundOptions {
    pub lookup_timeout: Duration,
    pub post_call_prompt: bool,
}

impl Default for ForegroundOptions {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(10),
            post_call_prompt: false,
        }
    }
}

impl ForegroundOptions {
    pub fn from_config(config: &CallerIdConfig) -> Self {
        Self {
            lookup_timeout: config.lookup.timeout(),
            post_call_prompt: config.notifications.post_call_prompt,
        }
    }
}

/// Collaborators the service is wired to.
pub struct ForegroundParts {
    pub cache: ContactCache,
    pub directory: Arc<dyn Directory>,
    pub notifier: Arc<dyn Notifier>,
    pub permissions: Arc<dyn PermissionGate>,
    pub telephony: Arc<dyn TelephonyEventSource>,
}

type EventStream = Arc<AsyncMutex<mpsc::Receiver<TelephonyEvent>>>;

pub struct ForegroundService {
    state: Arc<CallStateTracker>,
    cache: ContactCache,
    directory: Arc<dyn Directory>,
    presenter: NotificationPresenter,
    permissions: Arc<dyn PermissionGate>,
    telephony: Arc<dyn TelephonyEventSource>,
    options: ForegroundOptions,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Kept across `stop()`; a source may hand out its stream only once.
    events: Mutex<Option<EventStream>>,
}

impl ForegroundService {
    pub fn new(parts: ForegroundParts, options: ForegroundOptions) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(CallStateTracker::new()),
            cache: parts.cache,
            directory: parts.directory,
            presenter: NotificationPresenter::new(parts.notifier),
            permissions: parts.permissions,
            telephony: parts.telephony,
            options,
            listener: Mutex::new(None),
            events: Mutex::new(None),
        })
    }

    pub fn is_call_active(&self) -> bool {
        self.state.is_call_active()
    }

    pub fn is_processing(&self) -> bool {
        self.state.is_processing()
    }

    pub fn listener_state(&self) -> ListenerState {
        self.state.listener_state()
    }

    pub fn current_caller(&self) -> Option<CurrentCaller> {
        self.state.current_caller()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Attaches the telephony listener. Never fails: on denial or an
    /// unsupported platform the service stays `Idle` and logs why.
    pub async fn start(self: &Arc<Self>) -> ListenerState {
        if !self.state.try_begin_attach() {
            tracing::debug!(
                state = ?self.state.listener_state(),
                "Telephony listener already attached; ignoring start"
            );
            return self.state.listener_state();
        }

        let denied = self.permissions.request(&Permission::REQUIRED).await;
        if !denied.is_empty() {
            tracing::warn!(denied = ?denied, "Permissions denied; caller resolution disabled");
            self.state.set_listener_state(ListenerState::Idle);
            return ListenerState::Idle;
        }

        let events = match self.subscribed_events() {
            Some(events) => events,
            None => match self.subscribe().await {
                Some(events) => events,
                None => {
                    self.state.set_listener_state(ListenerState::Idle);
                    return ListenerState::Idle;
                }
            },
        };

        if self.state.listener_state() != ListenerState::Attaching {
            tracing::debug!("Stopped while attaching; keeping subscription for the next start");
            return self.state.listener_state();
        }

        let service = Arc::clone(self);
        let handle = tokio::spawn(async move { service.listen(events).await });
        if let Ok(mut slot) = self.listener.lock() {
            *slot = Some(handle);
        }
        self.state.set_listener_state(ListenerState::Listening);
        tracing::info!("Telephony listener attached");
        ListenerState::Listening
    }

    fn subscribed_events(&self) -> Option<EventStream> {
        self.events.lock().ok().and_then(|slot| slot.clone())
    }

    async fn subscribe(&self) -> Option<EventStream> {
        let receiver = match self.telephony.subscribe().await {
            Ok(receiver) => receiver,
            Err(CallerIdError::TelephonyUnsupported) => {
                tracing::info!("Telephony events unavailable on this platform; staying inert");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to subscribe to telephony events");
                return None;
            }
        };

        let events = Arc::new(AsyncMutex::new(receiver));
        if let Ok(mut slot) = self.events.lock() {
            *slot = Some(Arc::clone(&events));
        }
        Some(events)
    }

    /// Detaches the listener and forgets all call state.
    pub fn stop(&self) {
        if let Some(handle) = self.listener.lock().ok().and_then(|mut slot| slot.take()) {
            handle.abort();
        }
        self.state.reset();
        tracing::info!("Telephony listener stopped");
    }

    async fn listen(self: Arc<Self>, events: EventStream) {
        // An aborted predecessor releases the lock once it is dropped.
        let mut receiver = events.lock().await;
        while let Some(event) = receiver.recv().await {
            self.handle_event(event).await;
        }
        drop(receiver);

        tracing::info!("Telephony event stream closed");
        if let Ok(mut slot) = self.events.lock() {
            if slot.as_ref().is_some_and(|kept| Arc::ptr_eq(kept, &events)) {
                *slot = None;
            }
        }
        self.state.set_listener_state(ListenerState::Idle);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies one telephony event. For an accepted `incoming` the spawned
    /// resolve is returned so callers (and tests) can await its outcome.
    pub async fn handle_event(
        self: &Arc<Self>,
        event: TelephonyEvent,
    ) -> Option<JoinHandle<ResolveOutcome>> {
        tracing::debug!(event = %event.event, "Telephony event");
        match event.event {
            CallEvent::Incoming => {
                self.state.set_call_active(true);
                let number = match event.number() {
                    Some(number) => number.to_string(),
                    None => {
                        tracing::debug!("Incoming event without a number; nothing to resolve");
                        return None;
                    }
                };

                let guard = match self.state.try_begin_processing() {
                    Some(guard) => guard,
                    None => {
                        tracing::debug!("Resolve already running for this ring; dropping event");
                        return None;
                    }
                };

                let service = Arc::clone(self);
                Some(tokio::spawn(async move {
                    let _guard = guard;
                    service.resolve(&number).await
                }))
            }
            CallEvent::Offhook => {
                self.state.set_call_active(true);
                self.state.mark_answered();
                self.presenter.cancel().await;
                None
            }
            ended => {
                debug_assert!(ended.is_ended());
                self.state.set_call_active(false);
                let caller = self.state.take_current_caller();
                self.presenter.cancel().await;
                if let Some(caller) = caller {
                    if self.options.post_call_prompt && caller.answered {
                        self.presenter
                            .present_post_call(&caller.client_id, &caller.name)
                            .await;
                    }
                }
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────────

    /// Resolves `raw` through cache then directory and presents the caller if
    /// the call is still ringing.
    pub async fn resolve(&self, raw: &str) -> ResolveOutcome {
        let number = normalize(raw);
        if !number.is_matchable() {
            tracing::debug!("Incoming number has no digits; skipping lookup");
            return ResolveOutcome::Unmatchable;
        }

        if let Some(contact) = lookup_cached(&self.cache, &number) {
            return self.present_if_active(&contact, LookupSource::Cache).await;
        }

        let contact = match query_directory(
            self.directory.as_ref(),
            &number,
            raw,
            self.options.lookup_timeout,
        )
        .await
        {
            Some(contact) => contact,
            None => return ResolveOutcome::NoMatch,
        };

        let outcome = self
            .present_if_active(&contact, LookupSource::Directory)
            .await;
        if !matches!(outcome, ResolveOutcome::Vetoed { .. }) {
            self_heal(&self.cache, &contact);
        }
        outcome
    }

    async fn present_if_active(&self, contact: &Contact, source: LookupSource) -> ResolveOutcome {
        if !self.state.is_call_active() {
            tracing::info!(source = %source, "Call ended before lookup finished; not alerting");
            return ResolveOutcome::Vetoed { source };
        }

        self.state.set_current_caller(&contact.id, &contact.name);
        self.presenter.present(contact).await;

        if !self.state.is_call_active() {
            tracing::info!(source = %source, "Call ended while alerting; retracting");
            self.presenter.cancel().await;
            let _ = self.state.take_current_caller();
            return ResolveOutcome::Retracted { source };
        }

        ResolveOutcome::Presented {
            client_id: contact.id.clone(),
            source,
        }
    }
}

impl Drop for ForegroundService {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().ok().and_then(|slot| slot.take()) {
            handle.abort();
        }
    }
}
