//! Core types shared by the foreground listener, the background task, and FFI clients.
//!
//! Field names follow the directory's row schema (`call_history`, `updated_at`)
//! because cache snapshots are written straight from directory responses.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

/// A known business contact.
///
/// Identity is `id`; call resolution matches on the digits of `phone` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "note")]
    pub notes: Option<String>,
    /// Newline-separated history, newest entry first.
    #[serde(default, alias = "callHistory")]
    pub call_history: Option<String>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

impl Contact {
    pub fn new(id: &str, name: &str, phone: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            role: None,
            notes: None,
            call_history: None,
            updated_at: None,
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn with_history(mut self, history: &str) -> Self {
        self.call_history = Some(history.to_string());
        self
    }

    /// Canonical digits of the stored phone number.
    pub fn phone_digits(&self) -> String {
        normalize(&self.phone).digits
    }

    /// Non-blank notes, trimmed.
    pub fn notes_text(&self) -> Option<&str> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
    }

    /// Non-blank history lines in stored order (newest first).
    pub fn history_lines(&self) -> Vec<&str> {
        self.call_history
            .as_deref()
            .map(|history| {
                history
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A contact is only worth caching when it can be matched again later.
    pub fn is_cacheable(&self) -> bool {
        !self.id.trim().is_empty() && !self.name.trim().is_empty() && !self.phone.trim().is_empty()
    }
}

/// Authenticated directory session persisted for the background task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub access_token: String,
}
