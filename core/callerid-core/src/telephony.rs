//! Telephony event source port.
//!
//! Only one mobile platform exposes phone-state events. Everywhere else the
//! source reports [`CallerIdError::TelephonyUnsupported`] and the foreground
//! listener stays inert.

use async_trait::async_trait;
use callerid_protocol::TelephonyEvent;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::{CallerIdError, Result};

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[async_trait]
pub trait TelephonyEventSource: Send + Sync {
    /// Opens the event stream. Called at most once per live subscription.
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelephonyEvent>>;
}

/// Source for platforms without phone-state events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTelephony;

#[async_trait]
impl TelephonyEventSource for NoTelephony {
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelephonyEvent>> {
        Err(CallerIdError::TelephonyUnsupported)
    }
}

/// Source fed by a host-held sender (socket bridge, tests).
///
/// The receiver half can be handed out once; later subscriptions fail.
pub struct ChannelTelephony {
    receiver: Mutex<Option<mpsc::Receiver<TelephonyEvent>>>,
}

impl ChannelTelephony {
    pub fn new() -> (mpsc::Sender<TelephonyEvent>, Self) {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            sender,
            Self {
                receiver: Mutex::new(Some(receiver)),
            },
        )
    }
}

#[async_trait]
impl TelephonyEventSource for ChannelTelephony {
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelephonyEvent>> {
        self.receiver
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or_else(|| CallerIdError::TelephonySubscribe("already subscribed".to_string()))
    }
}
