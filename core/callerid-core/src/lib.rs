//! # callerid-core
//!
//! Incoming-call caller resolution for a field-agent phone: when a known
//! contact rings, show who it is before the agent picks up.
//!
//! ## Design Principles
//!
//! - **Two tiers**: the durable contact cache answers first; the remote
//!   directory is asked only on a miss, bounded by a timeout, and a hit is
//!   written back into the cache.
//! - **Silent on failure**: event-callback paths log and return. Nothing raises
//!   out of the foreground listener or the background task.
//! - **Never alert a finished call**: every alert is gated on call state at the
//!   moment of display and retracted if the call ends during display.
//! - **FFI-ready**: UniFFI annotations expose the contact/session API and
//!   number normalization to Kotlin/Swift hosts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use callerid_core::{ForegroundParts, ForegroundOptions, ForegroundService};
//!
//! let service = ForegroundService::new(parts, ForegroundOptions::default());
//! service.start().await;
//! ```

// UniFFI scaffolding for Swift/Kotlin bindings
uniffi::setup_scaffolding!();

pub mod background;
pub mod cache;
pub mod call_state;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod foreground;
pub mod lookup;
pub mod native_sink;
pub mod normalize;
pub mod notify;
pub mod permissions;
pub mod session;
pub mod storage;
pub mod telephony;
pub mod types;

pub use background::{BackgroundTask, TaskOutcome};
pub use cache::ContactCache;
pub use call_state::{CallStateTracker, CurrentCaller, ListenerState};
pub use config::{load_config, CallerIdConfig, DirectoryConfig};
pub use directory::{
    Directory, DirectoryConnector, RestDirectory, RestDirectoryConnector, UnavailableDirectory,
};
pub use engine::CallerIdEngine;
pub use error::{CallerIdError, CallerIdFfiError, Result};
pub use foreground::{ForegroundOptions, ForegroundParts, ForegroundService};
pub use lookup::{LookupSource, ResolveOutcome};
pub use native_sink::{FileNativeSink, NativeSink};
pub use normalize::{normalize, normalize_number, NormalizedNumber};
pub use notify::{
    NotificationPresenter, NotificationRequest, Notifier, SpoolNotifier,
    INCOMING_CALL_NOTIFICATION_ID, POST_CALL_NOTIFICATION_ID,
};
pub use permissions::{Permission, PermissionGate, StaticPermissions};
pub use session::SessionStore;
pub use storage::StorageConfig;
pub use telephony::{ChannelTelephony, NoTelephony, TelephonyEventSource};
pub use types::{Contact, Session};

pub use callerid_protocol::{CallEvent, TaskPayload, TelephonyEvent};
