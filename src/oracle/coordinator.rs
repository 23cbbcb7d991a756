//! Randomness request coordination
//!
//! The coordinator is the in-process oracle endpoint. A request returns a
//! numeric id synchronously; the random words arrive later through the
//! consumer callback, exactly once per id. Pending ids are handed to the
//! fulfillment worker over an mpsc channel, so the delay between request
//! and callback is entirely outside the state machine.

use crate::errors::{OracleError, RaffleError};
use crate::oracle::vrf::{VrfBeacon, VrfDraw};
use crate::raffle::RequestId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Parameters attached to a single randomness request.
#[derive(Clone, Copy, Debug)]
pub struct RandomnessRequest {
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl Default for RandomnessRequest {
    fn default() -> Self {
        Self {
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }
}

/// Issues randomness requests; the oracle side of the raffle's seam.
pub trait RandomnessGateway: Send + Sync {
    fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId, OracleError>;
}

/// Receives fulfilled randomness; implemented by the raffle.
#[async_trait]
pub trait RandomnessConsumer: Send + Sync {
    async fn fulfill_random_words(
        &self,
        request_id: RequestId,
        words: &[u64],
    ) -> Result<(), RaffleError>;
}

/// In-process VRF oracle tracking outstanding requests.
pub struct VrfCoordinator {
    beacon: VrfBeacon,
    next_request_id: AtomicU64,
    pending: DashMap<RequestId, RandomnessRequest>,
    fulfillment_tx: mpsc::UnboundedSender<RequestId>,
}

impl VrfCoordinator {
    /// Returns the coordinator plus the receiving end of the request-id
    /// channel the fulfillment worker drains.
    pub fn new(beacon: VrfBeacon) -> (Arc<Self>, mpsc::UnboundedReceiver<RequestId>) {
        let (fulfillment_tx, fulfillment_rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(Self {
            beacon,
            // ids start at 1 so every issued id is > 0
            next_request_id: AtomicU64::new(1),
            pending: DashMap::new(),
            fulfillment_tx,
        });
        (coordinator, fulfillment_rx)
    }

    /// Deliver the random words for an outstanding request.
    ///
    /// The pending entry is consumed up front; a given id is fulfilled at
    /// most once, unknown ids are rejected.
    pub async fn fulfill(
        &self,
        request_id: RequestId,
        consumer: &dyn RandomnessConsumer,
    ) -> Result<VrfDraw, RaffleError> {
        let (_, request) = self
            .pending
            .remove(&request_id)
            .ok_or(OracleError::NonexistentRequest(request_id))?;
        let draw = self.beacon.draw(request_id, request.num_words)?;
        consumer.fulfill_random_words(request_id, &draw.words).await?;
        Ok(draw)
    }

    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn public_key_hex(&self) -> String {
        self.beacon.public_key_hex()
    }
}

impl RandomnessGateway for VrfCoordinator {
    fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId, OracleError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        self.pending.insert(request_id, request);
        // the worker may be absent when fulfillment is driven directly
        let _ = self.fulfillment_tx.send(request_id);
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Consumer recording every callback it receives.
    #[derive(Default)]
    struct RecordingConsumer {
        calls: Mutex<Vec<(RequestId, Vec<u64>)>>,
    }

    #[async_trait]
    impl RandomnessConsumer for RecordingConsumer {
        async fn fulfill_random_words(
            &self,
            request_id: RequestId,
            words: &[u64],
        ) -> Result<(), RaffleError> {
            self.calls.lock().unwrap().push((request_id, words.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn request_ids_are_positive_and_increasing() {
        let (coordinator, _rx) = VrfCoordinator::new(VrfBeacon::new_random());
        let first = coordinator
            .request_randomness(RandomnessRequest::default())
            .unwrap();
        let second = coordinator
            .request_randomness(RandomnessRequest::default())
            .unwrap();
        assert!(first > 0);
        assert!(second > first);
        assert_eq!(coordinator.pending_count(), 2);
    }

    #[test]
    fn requests_are_announced_on_the_fulfillment_channel() {
        let (coordinator, mut rx) = VrfCoordinator::new(VrfBeacon::new_random());
        let id = coordinator
            .request_randomness(RandomnessRequest::default())
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), id);
    }

    #[tokio::test]
    async fn fulfill_delivers_words_exactly_once() {
        let (coordinator, _rx) = VrfCoordinator::new(VrfBeacon::new_random());
        let consumer = RecordingConsumer::default();
        let id = coordinator
            .request_randomness(RandomnessRequest::default())
            .unwrap();

        let draw = coordinator.fulfill(id, &consumer).await.unwrap();
        assert_eq!(draw.words.len(), 1);
        {
            let calls = consumer.calls.lock().unwrap();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0], (id, draw.words.clone()));
        }
        assert!(!coordinator.is_pending(id));

        // second delivery of the same id is a nonexistent request
        let err = coordinator.fulfill(id, &consumer).await.unwrap_err();
        assert_eq!(err.code(), "nonexistent request");
    }

    #[tokio::test]
    async fn fulfill_rejects_unknown_ids() {
        let (coordinator, _rx) = VrfCoordinator::new(VrfBeacon::new_random());
        let consumer = RecordingConsumer::default();

        for id in [0, 1] {
            let err = coordinator.fulfill(id, &consumer).await.unwrap_err();
            assert_eq!(err.to_string(), "nonexistent request");
        }
        assert!(consumer.calls.lock().unwrap().is_empty());
    }
}
