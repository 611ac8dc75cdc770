//! Telephony event types shared by the callerid daemon, hook, and core library.
//!
//! The platform shim emits one [`TelephonyEvent`] per phone-state change, either
//! as a newline-delimited JSON line on the daemon socket (foreground) or as the
//! stdin payload of a background task invocation. Both paths parse through
//! [`parse_event_line`] so the two execution contexts never drift apart.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_EVENT_BYTES: usize = 16 * 1024;
pub const MAX_PHONE_NUMBER_CHARS: usize = 64;

/// Phone-state transitions reported by the telephony event source.
///
/// Accepts both the kebab-case wire names and the capitalized names some
/// platform bridges emit (`Incoming`, `Offhook`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallEvent {
    #[serde(alias = "Incoming")]
    Incoming,
    #[serde(alias = "Offhook")]
    Offhook,
    #[serde(alias = "Disconnected")]
    Disconnected,
    #[serde(alias = "Missed")]
    Missed,
    #[serde(alias = "IncomingEnded", alias = "incoming_ended")]
    IncomingEnded,
    #[serde(alias = "Rejected")]
    Rejected,
}

impl CallEvent {
    /// True for every event that means the ring is over without being answered
    /// or the conversation has finished.
    pub fn is_ended(self) -> bool {
        matches!(
            self,
            CallEvent::Disconnected
                | CallEvent::Missed
                | CallEvent::IncomingEnded
                | CallEvent::Rejected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallEvent::Incoming => "incoming",
            CallEvent::Offhook => "offhook",
            CallEvent::Disconnected => "disconnected",
            CallEvent::Missed => "missed",
            CallEvent::IncomingEnded => "incoming-ended",
            CallEvent::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for CallEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One phone-state change. `phone_number` is only meaningful for `incoming`
/// and may be absent even then (some devices report the number on a later
/// broadcast of the same ring).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelephonyEvent {
    pub event: CallEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Payload the OS hands to the background task. Same shape as a live event.
pub type TaskPayload = TelephonyEvent;

impl TelephonyEvent {
    pub fn new(event: CallEvent, phone_number: Option<&str>) -> Self {
        Self {
            event,
            phone_number: phone_number.map(str::to_string),
        }
    }

    pub fn incoming(phone_number: &str) -> Self {
        Self::new(CallEvent::Incoming, Some(phone_number))
    }

    /// The reported number, with blank strings treated as absent.
    pub fn number(&self) -> Option<&str> {
        self.phone_number
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if let Some(number) = self.phone_number.as_deref() {
            if number.chars().count() > MAX_PHONE_NUMBER_CHARS {
                return Err(ErrorInfo::new(
                    "invalid_phone_number",
                    format!("phoneNumber exceeds {} characters", MAX_PHONE_NUMBER_CHARS),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Reply written back to the shim for every line it sends the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
    pub protocol_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            ok: true,
            protocol_version: PROTOCOL_VERSION,
            error: None,
        }
    }

    pub fn error(error: ErrorInfo) -> Self {
        Self {
            ok: false,
            protocol_version: PROTOCOL_VERSION,
            error: Some(error),
        }
    }
}

/// Parses and validates a single JSON event (one socket line or one stdin payload).
pub fn parse_event_line(bytes: &[u8]) -> Result<TelephonyEvent, ErrorInfo> {
    if bytes.len() > MAX_EVENT_BYTES {
        return Err(ErrorInfo::new(
            "event_too_large",
            format!("event exceeds {} bytes", MAX_EVENT_BYTES),
        ));
    }

    let event: TelephonyEvent = serde_json::from_slice(bytes)
        .map_err(|err| ErrorInfo::new("invalid_json", err.to_string()))?;
    event.validate()?;
    Ok(event)
}
