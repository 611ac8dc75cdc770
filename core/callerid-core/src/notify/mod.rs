//! Caller notification content and presentation.
//!
//! Every incoming-call alert is displayed under one fixed identifier, so a
//! second ring (or the other execution context) updates the visible alert
//! instead of stacking a new one. Display and cancel faults are logged and
//! swallowed: a missing alert is acceptable, a crashed event callback is not.

mod spool;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Contact;

pub use spool::SpoolNotifier;

pub const INCOMING_CALL_NOTIFICATION_ID: &str = "incoming-call-notification";
pub const POST_CALL_NOTIFICATION_ID: &str = "post-call-notification";
pub const INCOMING_CALL_CHANNEL_ID: &str = "incoming-call-high-priority";
pub const POST_CALL_CHANNEL_ID: &str = "post-call-high-priority";

/// History lines shown in the expanded alert.
const RECENT_HISTORY_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Default,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: Importance,
    pub visibility: Visibility,
    pub vibration: bool,
    pub lights: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
}

/// Everything the OS notification service needs to render one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: String,
    pub channel: NotificationChannel,
    pub title: String,
    /// Collapsed, single-line text.
    pub body: String,
    /// Expanded inbox-style lines.
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub actions: Vec<NotificationAction>,
    /// Deep-link payload (`client_id`, `action`).
    pub data: BTreeMap<String, String>,
    pub auto_cancel: bool,
    pub full_screen: bool,
}

/// Port to the OS notification service.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn display(&self, request: &NotificationRequest) -> Result<()>;
    async fn cancel(&self, id: &str) -> Result<()>;
}

fn incoming_call_channel() -> NotificationChannel {
    NotificationChannel {
        id: INCOMING_CALL_CHANNEL_ID.to_string(),
        name: "Incoming Call (High Priority)".to_string(),
        importance: Importance::High,
        visibility: Visibility::Public,
        vibration: true,
        lights: true,
    }
}

fn post_call_channel() -> NotificationChannel {
    NotificationChannel {
        id: POST_CALL_CHANNEL_ID.to_string(),
        name: "Post Call (High Priority)".to_string(),
        importance: Importance::High,
        visibility: Visibility::Private,
        vibration: false,
        lights: false,
    }
}

/// Builds the incoming-call alert for `contact`.
pub fn incoming_call_request(contact: &Contact) -> NotificationRequest {
    let history = contact.history_lines();
    let notes = contact.notes_text();

    let mut lines = Vec::new();
    if history.is_empty() {
        lines.push("🕒 No history".to_string());
    } else {
        lines.push(format!("🕒 Recent history ({} total):", history.len()));
        lines.extend(
            history
                .iter()
                .take(RECENT_HISTORY_LINES)
                .map(|line| format!("  {}", line)),
        );
        if history.len() > RECENT_HISTORY_LINES {
            lines.push(format!(
                "  ... and {} more",
                history.len() - RECENT_HISTORY_LINES
            ));
        }
    }
    if let Some(notes) = notes {
        lines.push(format!("📝 Notes: {}", notes));
    }

    let body = match (history.len(), notes) {
        (0, Some(notes)) => format!("📝 Notes: {}", notes),
        (0, None) => "No details".to_string(),
        (count, Some(notes)) => format!("🕒 {} entries | 📝 {}", count, notes),
        (count, None) => format!("🕒 {} entries", count),
    };

    let mut data = BTreeMap::new();
    data.insert("client_id".to_string(), contact.id.clone());

    NotificationRequest {
        id: INCOMING_CALL_NOTIFICATION_ID.to_string(),
        channel: incoming_call_channel(),
        title: format!("📞 {}", contact.name),
        body,
        lines,
        category: Some("call".to_string()),
        actions: vec![NotificationAction {
            id: "open_app".to_string(),
            title: "Open app".to_string(),
        }],
        data,
        auto_cancel: true,
        full_screen: true,
    }
}

/// Builds the "record a note" prompt shown after an answered call ends.
pub fn post_call_request(client_id: &str, name: &str) -> NotificationRequest {
    let mut data = BTreeMap::new();
    data.insert("client_id".to_string(), client_id.to_string());
    data.insert("action".to_string(), "post_call_note".to_string());

    NotificationRequest {
        id: POST_CALL_NOTIFICATION_ID.to_string(),
        channel: post_call_channel(),
        title: "How did the call go?".to_string(),
        body: format!("Record a note about your call with {}.", name),
        lines: Vec::new(),
        category: None,
        actions: vec![NotificationAction {
            id: "add_note".to_string(),
            title: "Add note".to_string(),
        }],
        data,
        auto_cancel: true,
        full_screen: false,
    }
}

/// Presents and cancels the caller alert through a [`Notifier`].
#[derive(Clone)]
pub struct NotificationPresenter {
    notifier: Arc<dyn Notifier>,
}

impl NotificationPresenter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn present(&self, contact: &Contact) {
        let request = incoming_call_request(contact);
        match self.notifier.display(&request).await {
            Ok(()) => {
                tracing::info!(client_id = %contact.id, "Caller notification displayed")
            }
            Err(err) => tracing::error!(error = %err, "Failed to display caller notification"),
        }
    }

    /// Removes the caller alert. Safe when none is showing.
    pub async fn cancel(&self) {
        if let Err(err) = self.notifier.cancel(INCOMING_CALL_NOTIFICATION_ID).await {
            tracing::warn!(error = %err, "Failed to cancel caller notification");
        }
    }

    pub async fn present_post_call(&self, client_id: &str, name: &str) {
        let request = post_call_request(client_id, name);
        if let Err(err) = self.notifier.display(&request).await {
            tracing::error!(error = %err, "Failed to display post-call notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallerIdError;

    #[test]
    fn digest_shows_three_newest_lines_and_overflow() {
        let contact = Contact::new("c1", "Kim", "010-1234-5678")
            .with_history("05 newest\n04\n03\n02\n01 oldest")
            .with_notes("prefers mornings");

        let request = incoming_call_request(&contact);

        assert_eq!(request.id, INCOMING_CALL_NOTIFICATION_ID);
        assert_eq!(request.title, "📞 Kim");
        assert_eq!(
            request.lines,
            vec![
                "🕒 Recent history (5 total):",
                "  05 newest",
                "  04",
                "  03",
                "  ... and 2 more",
                "📝 Notes: prefers mornings",
            ]
        );
        assert_eq!(request.body, "🕒 5 entries | 📝 prefers mornings");
        assert_eq!(request.data.get("client_id").map(String::as_str), Some("c1"));
    }

    #[test]
    fn digest_without_history_or_notes() {
        let request = incoming_call_request(&Contact::new("c2", "Lee", "010-9999-0000"));
        assert_eq!(request.lines, vec!["🕒 No history"]);
        assert_eq!(request.body, "No details");
    }

    #[test]
    fn digest_with_short_history_has_no_overflow() {
        let contact = Contact::new("c3", "Park", "010").with_history("only line");
        let request = incoming_call_request(&contact);
        assert_eq!(
            request.lines,
            vec!["🕒 Recent history (1 total):", "  only line"]
        );
        assert_eq!(request.body, "🕒 1 entries");
    }

    #[test]
    fn channel_is_high_importance_public() {
        let request = incoming_call_request(&Contact::new("c1", "Kim", "010"));
        assert_eq!(request.channel.importance, Importance::High);
        assert_eq!(request.channel.visibility, Visibility::Public);
    }

    #[test]
    fn post_call_prompt_carries_action_payload() {
        let request = post_call_request("c1", "Kim");
        assert_eq!(request.id, POST_CALL_NOTIFICATION_ID);
        assert_eq!(
            request.data.get("action").map(String::as_str),
            Some("post_call_note")
        );
    }

    struct BrokenNotifier;

    #[async_trait]
    impl Notifier for BrokenNotifier {
        async fn display(&self, _request: &NotificationRequest) -> Result<()> {
            Err(CallerIdError::Notification("service gone".to_string()))
        }

        async fn cancel(&self, _id: &str) -> Result<()> {
            Err(CallerIdError::Notification("service gone".to_string()))
        }
    }

    #[tokio::test]
    async fn presenter_swallows_notifier_faults() {
        let presenter = NotificationPresenter::new(Arc::new(BrokenNotifier));
        presenter.present(&Contact::new("c1", "Kim", "010")).await;
        presenter.cancel().await;
        presenter.present_post_call("c1", "Kim").await;
    }
}
