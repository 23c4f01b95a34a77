//! WebSocket notifications for envelope slot updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to subscribers of a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotMessage {
    /// Connection established
    Connected,

    /// A slot now holds a new envelope
    Updated {
        /// Slot key
        key: String,
        /// Encoded envelope
        envelope: String,
    },

    /// A slot was emptied
    Cleared {
        /// Slot key
        key: String,
    },
}

impl SlotMessage {
    /// Slot this message concerns, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            SlotMessage::Connected => None,
            SlotMessage::Updated { key, .. } | SlotMessage::Cleared { key } => Some(key),
        }
    }
}

/// Hub for broadcasting slot updates to all connected consumers.
#[derive(Debug, Clone)]
pub struct EnvelopeHub {
    sender: broadcast::Sender<SlotMessage>,
    /// Last envelope published per slot
    published: Arc<Mutex<HashMap<String, String>>>,
}

impl EnvelopeHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            published: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Announce a new envelope for `key`.
    ///
    /// Publishing the same envelope twice in a row is a no-op, so a PUT and
    /// the file watcher seeing that PUT land produce one message. Returns
    /// whether a message was sent.
    pub fn publish(&self, key: &str, envelope: &str) -> bool {
        if let Ok(mut published) = self.published.lock() {
            if published.get(key).map(String::as_str) == Some(envelope) {
                return false;
            }
            published.insert(key.to_string(), envelope.to_string());
        }
        self.send(SlotMessage::Updated {
            key: key.to_string(),
            envelope: envelope.to_string(),
        });
        true
    }

    /// Announce that `key` no longer holds an envelope.
    pub fn clear(&self, key: &str) {
        if let Ok(mut published) = self.published.lock() {
            published.remove(key);
        }
        self.send(SlotMessage::Cleared {
            key: key.to_string(),
        });
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: SlotMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to slot messages.
    pub fn subscribe(&self) -> broadcast::Receiver<SlotMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EnvelopeHub {
    fn default() -> Self {
        Self::new()
    }
}
