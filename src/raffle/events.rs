//! Raffle notifications
//!
//! Observable events published on a broadcast bus. Off-process watchers
//! attach through the SSE feed; test suites subscribe directly to observe
//! round completion.

use crate::raffle::{Amount, RequestId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RaffleEvent {
    /// A participant entered the current round.
    Entered { player: String, fee_paid: Amount },
    /// Entry closed; a randomness request is outstanding.
    RandomnessRequested { request_id: RequestId },
    /// The round settled and the pot was paid out.
    WinnerPicked { winner: String, amount: Amount },
}

impl RaffleEvent {
    /// Event name used for the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            RaffleEvent::Entered { .. } => "entered",
            RaffleEvent::RandomnessRequested { .. } => "randomness_requested",
            RaffleEvent::WinnerPicked { .. } => "winner_picked",
        }
    }
}

/// Broadcast bus for raffle events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RaffleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.tx.subscribe()
    }

    /// Publish to all current subscribers; no subscribers is not an error.
    pub fn publish(&self, event: RaffleEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
