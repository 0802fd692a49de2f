//! Events surfaced to the UI layer.
//!
//! The HTTP layer never navigates or renders; it reports what happened
//! through this channel and the subscriber (toast host, router) reacts.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ErrorCategory;

/// Events emitted by the client while handling responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// One user-visible message per failed call.
    Notice {
        category: ErrorCategory,
        message: String,
    },

    /// The session was cleared after an authentication failure. The
    /// navigation layer should send the user to the login screen,
    /// preserving the current location as the post-login destination.
    SessionInvalidated,
}

/// Channel-based event sender.
pub type ClientEventTx = mpsc::Sender<ClientEvent>;

/// Channel-based event receiver.
pub type ClientEventRx = mpsc::Receiver<ClientEvent>;

/// Default channel capacity for client events.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Creates a bounded event channel with the default capacity.
pub fn create_event_channel() -> (ClientEventTx, ClientEventRx) {
    mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY)
}

/// Event sender wrapper with best-effort and reliable send modes.
///
/// Use `notify()` for per-failure notices that can be dropped if the
/// consumer lags. Use `send_important()` for events that must be delivered
/// (session invalidation).
#[derive(Clone)]
pub struct EventSender {
    tx: ClientEventTx,
}

impl EventSender {
    /// Creates a new `EventSender` wrapping the given channel sender.
    pub fn new(tx: ClientEventTx) -> Self {
        Self { tx }
    }

    /// Best-effort send: never awaits, drops if the channel is full or the
    /// receiver is gone.
    pub fn notify(&self, category: ErrorCategory, message: impl Into<String>) {
        let _ = self.tx.try_send(ClientEvent::Notice {
            category,
            message: message.into(),
        });
    }

    /// Reliable send: awaits delivery.
    pub async fn send_important(&self, ev: ClientEvent) {
        let _ = self.tx.send(ev).await;
    }
}
