//! Process-local call state for the foreground listener.
//!
//! Nothing here is persisted: a restarted process always begins with no active
//! call. The background task never touches this state.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle of the telephony subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Attaching,
    Listening,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ListenerState::Attaching,
            2 => ListenerState::Listening,
            _ => ListenerState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ListenerState::Idle => 0,
            ListenerState::Attaching => 1,
            ListenerState::Listening => 2,
        }
    }
}

/// Caller resolved for the ring in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCaller {
    pub client_id: String,
    pub name: String,
    pub answered: bool,
}

#[derive(Debug)]
pub struct CallStateTracker {
    call_active: AtomicBool,
    processing_incoming: AtomicBool,
    /// Bumped by `reset` so guards from before it cannot release a newer claim.
    generation: AtomicU64,
    listener: AtomicU8,
    current_caller: Mutex<Option<CurrentCaller>>,
}

impl Default for CallStateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStateTracker {
    pub fn new() -> Self {
        Self {
            call_active: AtomicBool::new(false),
            processing_incoming: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            listener: AtomicU8::new(ListenerState::Idle.as_u8()),
            current_caller: Mutex::new(None),
        }
    }

    pub fn is_call_active(&self) -> bool {
        self.call_active.load(Ordering::SeqCst)
    }

    pub fn set_call_active(&self, active: bool) {
        self.call_active.store(active, Ordering::SeqCst);
    }

    pub fn is_processing(&self) -> bool {
        self.processing_incoming.load(Ordering::SeqCst)
    }

    /// Claims the debounce flag. Returns `None` if a resolve is already running.
    pub fn try_begin_processing(self: &Arc<Self>) -> Option<ProcessingGuard> {
        self.processing_incoming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ProcessingGuard {
                tracker: Arc::clone(self),
                generation: self.generation.load(Ordering::SeqCst),
            })
    }

    pub fn listener_state(&self) -> ListenerState {
        ListenerState::from_u8(self.listener.load(Ordering::SeqCst))
    }

    pub fn set_listener_state(&self, state: ListenerState) {
        self.listener.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Moves `Idle → Attaching`. Fails if a subscription exists or is being set up.
    pub fn try_begin_attach(&self) -> bool {
        self.listener
            .compare_exchange(
                ListenerState::Idle.as_u8(),
                ListenerState::Attaching.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn set_current_caller(&self, client_id: &str, name: &str) {
        if let Ok(mut slot) = self.current_caller.lock() {
            *slot = Some(CurrentCaller {
                client_id: client_id.to_string(),
                name: name.to_string(),
                answered: false,
            });
        }
    }

    pub fn mark_answered(&self) {
        if let Ok(mut slot) = self.current_caller.lock() {
            if let Some(caller) = slot.as_mut() {
                caller.answered = true;
            }
        }
    }

    pub fn current_caller(&self) -> Option<CurrentCaller> {
        self.current_caller
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }

    /// Clears the scratch caller, returning what was there.
    pub fn take_current_caller(&self) -> Option<CurrentCaller> {
        self.current_caller
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_default()
    }

    /// Back to a fresh-process state, listener included.
    pub fn reset(&self) {
        self.set_call_active(false);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.processing_incoming.store(false, Ordering::SeqCst);
        self.set_listener_state(ListenerState::Idle);
        let _ = self.take_current_caller();
    }
}

/// Clears the debounce flag on drop, including when the resolve panics.
///
/// A guard claimed before a `reset` leaves the flag alone: it may belong to a
/// resolve started after the reset.
#[derive(Debug)]
pub struct ProcessingGuard {
    tracker: Arc<CallStateTracker>,
    generation: u64,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if self.tracker.generation.load(Ordering::SeqCst) == self.generation {
            self.tracker
                .processing_incoming
                .store(false, Ordering::SeqCst);
        }
    }
}
