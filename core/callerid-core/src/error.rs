//! Error types for callerid-core operations.
//! Keep CallerIdFfiError minimal and stable to avoid breaking FFI clients.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Kotlin/Swift)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CallerIdFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<String> for CallerIdFfiError {
    fn from(message: String) -> Self {
        CallerIdFfiError::General { message }
    }
}

impl From<&str> for CallerIdFfiError {
    fn from(message: &str) -> Self {
        CallerIdFfiError::General {
            message: message.to_string(),
        }
    }
}

impl From<CallerIdError> for CallerIdFfiError {
    fn from(err: CallerIdError) -> Self {
        CallerIdFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in callerid-core operations.
///
/// Event-callback paths (foreground listener, background task) never surface
/// these; they log and fall silent. CRUD-facing APIs return them.
#[derive(Debug, thiserror::Error)]
pub enum CallerIdError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Directory Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Directory not configured")]
    DirectoryNotConfigured,

    #[error("Directory request failed: {0}")]
    DirectoryRequest(String),

    #[error("Directory query timed out after {0:?}")]
    DirectoryTimeout(std::time::Duration),

    // ─────────────────────────────────────────────────────────────────────
    // Platform Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Telephony events are not available on this platform")]
    TelephonyUnsupported,

    #[error("Telephony subscription failed: {0}")]
    TelephonySubscribe(String),

    #[error("Notification display failed: {0}")]
    Notification(String),

    #[error("Native sink write failed: {0}")]
    NativeSink(String),
}

impl CallerIdError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CallerIdError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        CallerIdError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using CallerIdError.
pub type Result<T> = std::result::Result<T, CallerIdError>;

impl From<CallerIdError> for String {
    fn from(err: CallerIdError) -> String {
        err.to_string()
    }
}
