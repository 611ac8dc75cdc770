#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use callerid_core::directory::{Directory, DirectoryConnector};
use callerid_core::error::{CallerIdError, Result};
use callerid_core::notify::{NotificationRequest, Notifier};
use callerid_core::types::{Contact, Session};
use tokio::sync::Notify;

pub fn kim() -> Contact {
    Contact::new("c1", "Kim", "010-1234-5678")
        .with_history("2024-05-01 viewing\n2024-04-20 first call")
        .with_notes("prefers mornings")
}

pub fn lee() -> Contact {
    Contact::new("c2", "Lee", "010-9999-0000")
}

/// Notifier that keeps the visible slots in memory and counts calls.
#[derive(Default)]
pub struct RecordingNotifier {
    showing: Mutex<HashMap<String, NotificationRequest>>,
    displays: AtomicUsize,
    cancels: AtomicUsize,
}

impl RecordingNotifier {
    pub fn showing(&self, id: &str) -> Option<NotificationRequest> {
        self.showing.lock().unwrap().get(id).cloned()
    }

    pub fn displays(&self) -> usize {
        self.displays.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn display(&self, request: &NotificationRequest) -> Result<()> {
        self.displays.fetch_add(1, Ordering::SeqCst);
        self.showing
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.showing.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Directory that answers with a fixed row, optionally held until released.
pub struct FakeDirectory {
    row: Option<Contact>,
    gate: Option<Notify>,
    calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn answering(row: Option<Contact>) -> Self {
        Self {
            row,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn gated(row: Option<Contact>) -> Self {
        Self {
            row,
            gate: Some(Notify::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn find_contact_by_phone(&self, candidates: &[String]) -> Result<Option<Contact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self
            .row
            .clone()
            .filter(|row| candidates.iter().any(|candidate| *candidate == row.phone)))
    }

    async fn current_session(&self) -> Option<Session> {
        None
    }
}

/// Directory whose query never completes.
pub struct HangingDirectory;

#[async_trait]
impl Directory for HangingDirectory {
    async fn find_contact_by_phone(&self, _candidates: &[String]) -> Result<Option<Contact>> {
        std::future::pending().await
    }

    async fn current_session(&self) -> Option<Session> {
        None
    }
}

/// Hands out the same directory and records the sessions it was given.
pub struct FakeConnector {
    directory: Option<Arc<dyn Directory>>,
    sessions: Mutex<Vec<Option<Session>>>,
}

impl FakeConnector {
    pub fn with(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory: Some(directory),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            directory: None,
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn sessions(&self) -> Vec<Option<Session>> {
        self.sessions.lock().unwrap().clone()
    }
}

impl DirectoryConnector for FakeConnector {
    fn connect(&self, session: Option<Session>) -> Result<Arc<dyn Directory>> {
        self.sessions.lock().unwrap().push(session);
        self.directory
            .clone()
            .ok_or(CallerIdError::DirectoryNotConfigured)
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
