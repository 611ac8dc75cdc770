//! Hands socket events to the foreground listener.
//!
//! Some devices broadcast `incoming` twice per ring and only the first carries
//! the number. The bridge remembers the last reported number for the ring in
//! progress and fills it into a later numberless `incoming`.

use std::sync::Mutex;

use callerid_protocol::{CallEvent, ErrorInfo, TelephonyEvent};
use tokio::sync::mpsc;

pub struct EventBridge {
    sender: mpsc::Sender<TelephonyEvent>,
    last_number: Mutex<Option<String>>,
}

impl EventBridge {
    pub fn new(sender: mpsc::Sender<TelephonyEvent>) -> Self {
        Self {
            sender,
            last_number: Mutex::new(None),
        }
    }

    fn fill_number(&self, mut event: TelephonyEvent) -> TelephonyEvent {
        let Ok(mut last) = self.last_number.lock() else {
            return event;
        };

        match event.event {
            CallEvent::Incoming => match event.number() {
                Some(number) => *last = Some(number.to_string()),
                None => {
                    if let Some(number) = last.as_ref() {
                        tracing::debug!("Filling numberless incoming from previous broadcast");
                        event.phone_number = Some(number.clone());
                    }
                }
            },
            CallEvent::Offhook => {}
            _ => *last = None,
        }
        event
    }

    pub async fn forward(&self, event: TelephonyEvent) -> Result<(), ErrorInfo> {
        let event = self.fill_number(event);
        self.sender.send(event).await.map_err(|_| {
            ErrorInfo::new("listener_closed", "telephony listener is not running")
        })
    }
}
