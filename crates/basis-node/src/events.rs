//! Event broadcast to RPC subscribers.
//!
//! Ledger events drained after each successful call are stamped with a
//! sequence number and the call time, then pushed to every subscribed
//! connection. Each subscriber has an independent buffer; a subscriber
//! that falls behind by more than the buffer loses the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use basis_types::{Address, LedgerEvent, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A published ledger event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Position in the node's event stream, starting at 1.
    pub sequence: u64,
    /// Unix timestamp of the call that produced it.
    pub timestamp: Timestamp,
    /// The ledger event, flattened so `event_type` sits at the top level.
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Filter for event subscriptions. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Event names such as `"delegated"` or `"reward_added"`.
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    /// Only events where one of these addresses is a party.
    #[serde(default)]
    pub addresses: Option<Vec<Address>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamp and emit an event to all subscribers. Returns its sequence.
    pub fn emit(&self, event: LedgerEvent, timestamp: Timestamp) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(sequence, event_type = event.name(), "event emitted");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(Event {
            sequence,
            timestamp,
            event,
        });
        sequence
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Sequence number of the last emitted event.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == event.event.name()) {
                return false;
            }
        }

        if let Some(ref addresses) = self.addresses {
            if !addresses.iter().any(|a| event.event.involves(a)) {
                return false;
            }
        }

        true
    }
}
