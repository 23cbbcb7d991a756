//! The raffle state machine
//!
//! A cyclic two-state machine: `Open` accepts entries until the automation
//! trigger closes the round and requests randomness (`Calculating`); the
//! oracle callback picks the winner, pays out, and reopens. All collaborators
//! (clock, randomness gateway, payout sink, event bus) are injected, and all
//! mutation funnels through the transition methods below.

use crate::clock::Clock;
use crate::errors::{OracleError, RaffleError};
use crate::oracle::{RandomnessConsumer, RandomnessGateway, RandomnessRequest};
use crate::raffle::events::{EventBus, RaffleEvent};
use crate::raffle::registry::EntryRegistry;
use crate::raffle::treasury::Treasury;
use crate::raffle::{Amount, RequestId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Lifecycle state of the raffle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaffleState {
    /// Accepting entries.
    Open,
    /// Entry closed; waiting for the oracle callback.
    Calculating,
}

/// The four upkeep conjuncts, reported individually for diagnostics.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UpkeepStatus {
    pub is_open: bool,
    pub interval_elapsed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepStatus {
    /// Upkeep is needed only when every conjunct holds.
    pub fn needed(&self) -> bool {
        self.is_open && self.interval_elapsed && self.has_players && self.has_balance
    }
}

/// Construction parameters; immutable for the raffle's lifetime.
#[derive(Clone, Copy, Debug)]
pub struct RaffleParams {
    pub entrance_fee: Amount,
    pub interval_secs: u64,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl Default for RaffleParams {
    fn default() -> Self {
        Self {
            entrance_fee: 10_000_000,
            interval_secs: 30,
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }
}

struct Inner {
    state: RaffleState,
    players: EntryRegistry,
    last_timestamp: u64,
    pending_request: Option<RequestId>,
    recent_winner: Option<String>,
}

/// The raffle singleton.
pub struct Raffle {
    params: RaffleParams,
    inner: RwLock<Inner>,
    treasury: Treasury,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn RandomnessGateway>,
    events: EventBus,
}

impl Raffle {
    pub fn new(
        params: RaffleParams,
        treasury: Treasury,
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn RandomnessGateway>,
        events: EventBus,
    ) -> Self {
        let last_timestamp = clock.now();
        Self {
            params,
            inner: RwLock::new(Inner {
                state: RaffleState::Open,
                players: EntryRegistry::new(),
                last_timestamp,
                pending_request: None,
                recent_winner: None,
            }),
            treasury,
            clock,
            gateway,
            events,
        }
    }

    /// Enter the current round with an attached fee.
    pub fn enter(&self, player: impl Into<String>, fee_paid: Amount) -> Result<(), RaffleError> {
        let player = player.into();
        {
            let mut inner = self.inner.write().unwrap();
            if fee_paid < self.params.entrance_fee {
                return Err(RaffleError::NotEnoughFee {
                    paid: fee_paid,
                    required: self.params.entrance_fee,
                });
            }
            if inner.state != RaffleState::Open {
                return Err(RaffleError::NotOpen);
            }
            inner.players.add(player.clone());
            self.treasury.deposit(fee_paid);
        }
        self.events.publish(RaffleEvent::Entered { player, fee_paid });
        Ok(())
    }

    /// Evaluate the upkeep predicate without mutating anything.
    ///
    /// The result is advisory; `perform_upkeep` re-checks atomically, so a
    /// stale answer can never cause an invalid transition.
    pub fn check_upkeep(&self) -> UpkeepStatus {
        let inner = self.inner.read().unwrap();
        self.upkeep_status(&inner)
    }

    fn upkeep_status(&self, inner: &Inner) -> UpkeepStatus {
        UpkeepStatus {
            is_open: inner.state == RaffleState::Open,
            interval_elapsed: self.clock.now().saturating_sub(inner.last_timestamp)
                >= self.params.interval_secs,
            has_players: inner.players.count() > 0,
            has_balance: self.treasury.balance() > 0,
        }
    }

    /// Close entry and request randomness. The only exit from `Open`.
    pub fn perform_upkeep(&self) -> Result<RequestId, RaffleError> {
        let request_id = {
            let mut inner = self.inner.write().unwrap();
            if !self.upkeep_status(&inner).needed() {
                return Err(RaffleError::UpkeepNotNeeded {
                    balance: self.treasury.balance(),
                    players: inner.players.count(),
                    state: inner.state,
                });
            }
            inner.state = RaffleState::Calculating;
            let request = RandomnessRequest {
                callback_gas_limit: self.params.callback_gas_limit,
                num_words: self.params.num_words,
            };
            let request_id = match self.gateway.request_randomness(request) {
                Ok(id) => id,
                Err(e) => {
                    // a rejected request leaves the raffle open; nothing else changed
                    inner.state = RaffleState::Open;
                    return Err(e.into());
                }
            };
            inner.pending_request = Some(request_id);
            request_id
        };
        self.events
            .publish(RaffleEvent::RandomnessRequested { request_id });
        Ok(request_id)
    }

    // --- read-only accessors ---

    pub fn entrance_fee(&self) -> Amount {
        self.params.entrance_fee
    }

    pub fn interval_secs(&self) -> u64 {
        self.params.interval_secs
    }

    pub fn state(&self) -> RaffleState {
        self.inner.read().unwrap().state
    }

    pub fn player(&self, index: usize) -> Result<String, RaffleError> {
        self.inner
            .read()
            .unwrap()
            .players
            .get(index)
            .map(Clone::clone)
    }

    pub fn players(&self) -> Vec<String> {
        self.inner.read().unwrap().players.players().to_vec()
    }

    pub fn player_count(&self) -> usize {
        self.inner.read().unwrap().players.count()
    }

    pub fn last_timestamp(&self) -> u64 {
        self.inner.read().unwrap().last_timestamp
    }

    pub fn recent_winner(&self) -> Option<String> {
        self.inner.read().unwrap().recent_winner.clone()
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.inner.read().unwrap().pending_request
    }

    pub fn pot(&self) -> Amount {
        self.treasury.balance()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RaffleEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RandomnessConsumer for Raffle {
    /// Oracle callback: pick the winner, reset the round, pay out.
    ///
    /// All bookkeeping commits under the lock, before the transfer is
    /// attempted; a failed transfer cannot roll it back (the winner was
    /// derived from consumed randomness), so the pot is merely restored to
    /// the treasury and the failure reported.
    async fn fulfill_random_words(
        &self,
        request_id: RequestId,
        words: &[u64],
    ) -> Result<(), RaffleError> {
        let (winner, pot) = {
            let mut inner = self.inner.write().unwrap();
            if inner.state != RaffleState::Calculating
                || inner.pending_request != Some(request_id)
            {
                return Err(RaffleError::UnknownRequest(request_id));
            }
            let word = *words.first().ok_or(OracleError::EmptyRandomness)?;
            // count > 0: checked at trigger time, registry immutable while Calculating
            let winner_index = (word % inner.players.count() as u64) as usize;
            let winner = inner.players.get(winner_index)?.clone();

            inner.recent_winner = Some(winner.clone());
            inner.players.clear();
            inner.last_timestamp = self.clock.now();
            inner.state = RaffleState::Open;
            inner.pending_request = None;
            let pot = self.treasury.take_pot();
            (winner, pot)
        };
        self.treasury.payout(&winner, pot).await?;
        self.events.publish(RaffleEvent::WinnerPicked {
            winner,
            amount: pot,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::errors::TransferError;
    use crate::raffle::treasury::{MemoryBank, PayoutSink};
    use std::sync::atomic::{AtomicU64, Ordering};

    const FEE: Amount = 10_000_000;
    const INTERVAL: u64 = 30;

    /// Gateway handing out sequential ids without any oracle behind it.
    struct CountingGateway {
        next: AtomicU64,
    }

    impl CountingGateway {
        fn new() -> Self {
            Self {
                next: AtomicU64::new(1),
            }
        }
    }

    impl RandomnessGateway for CountingGateway {
        fn request_randomness(
            &self,
            _request: RandomnessRequest,
        ) -> Result<RequestId, OracleError> {
            Ok(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl PayoutSink for RejectingSink {
        async fn transfer(&self, _to: &str, _amount: Amount) -> Result<(), TransferError> {
            Err(TransferError("receiver cannot accept funds".to_string()))
        }
    }

    struct Fixture {
        raffle: Raffle,
        clock: Arc<ManualClock>,
        bank: Arc<MemoryBank>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000));
        let bank = Arc::new(MemoryBank::new());
        let raffle = Raffle::new(
            RaffleParams {
                entrance_fee: FEE,
                interval_secs: INTERVAL,
                ..RaffleParams::default()
            },
            Treasury::new(bank.clone()),
            clock.clone(),
            Arc::new(CountingGateway::new()),
            EventBus::new(64),
        );
        Fixture {
            raffle,
            clock,
            bank,
        }
    }

    fn fixture_with_sink(sink: Arc<dyn PayoutSink>) -> (Raffle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let raffle = Raffle::new(
            RaffleParams {
                entrance_fee: FEE,
                interval_secs: INTERVAL,
                ..RaffleParams::default()
            },
            Treasury::new(sink),
            clock.clone(),
            Arc::new(CountingGateway::new()),
            EventBus::new(64),
        );
        (raffle, clock)
    }

    #[test]
    fn starts_open_with_constructor_values() {
        let f = fixture();
        assert_eq!(f.raffle.state(), RaffleState::Open);
        assert_eq!(f.raffle.entrance_fee(), FEE);
        assert_eq!(f.raffle.interval_secs(), INTERVAL);
        assert_eq!(f.raffle.player_count(), 0);
        assert_eq!(f.raffle.last_timestamp(), 1_000);
        assert_eq!(f.raffle.recent_winner(), None);
        assert_eq!(f.raffle.pending_request(), None);
    }

    #[test]
    fn entries_keep_call_order() {
        let f = fixture();
        for name in ["alice", "bob", "carol"] {
            f.raffle.enter(name, FEE).unwrap();
        }
        assert_eq!(f.raffle.player_count(), 3);
        assert_eq!(f.raffle.player(0).unwrap(), "alice");
        assert_eq!(f.raffle.player(1).unwrap(), "bob");
        assert_eq!(f.raffle.player(2).unwrap(), "carol");
        assert_eq!(f.raffle.pot(), 3 * FEE);
    }

    #[test]
    fn insufficient_fee_mutates_nothing() {
        let f = fixture();
        let err = f.raffle.enter("alice", FEE - 1).unwrap_err();
        assert_eq!(err.code(), "NotEnoughEthEntered");
        assert_eq!(f.raffle.player_count(), 0);
        assert_eq!(f.raffle.pot(), 0);
    }

    #[test]
    fn check_upkeep_requires_all_four_conjuncts() {
        let f = fixture();

        // no players, no balance, time not elapsed
        let status = f.raffle.check_upkeep();
        assert!(!status.needed());
        assert!(status.is_open);
        assert!(!status.interval_elapsed);
        assert!(!status.has_players);
        assert!(!status.has_balance);

        // time alone is insufficient
        f.clock.advance(INTERVAL + 1);
        assert!(!f.raffle.check_upkeep().needed());

        // players + balance + time + open: needed
        f.raffle.enter("alice", FEE).unwrap();
        let status = f.raffle.check_upkeep();
        assert!(status.needed());

        // calculating falsifies is_open
        f.raffle.perform_upkeep().unwrap();
        let status = f.raffle.check_upkeep();
        assert!(!status.is_open);
        assert!(!status.needed());
    }

    #[test]
    fn check_upkeep_false_before_interval() {
        let f = fixture();
        f.raffle.enter("alice", FEE).unwrap();
        f.clock.advance(INTERVAL - 5);
        let status = f.raffle.check_upkeep();
        assert!(!status.interval_elapsed);
        assert!(!status.needed());
    }

    #[test]
    fn perform_upkeep_rejects_when_not_needed() {
        let f = fixture();
        let err = f.raffle.perform_upkeep().unwrap_err();
        assert_eq!(err.code(), "UpkeepNotNeeded");
        match err {
            RaffleError::UpkeepNotNeeded {
                balance,
                players,
                state,
            } => {
                assert_eq!(balance, 0);
                assert_eq!(players, 0);
                assert_eq!(state, RaffleState::Open);
            }
            other => panic!("unexpected error: {other}"),
        }
        // total no-op aside from the failure signal
        assert_eq!(f.raffle.state(), RaffleState::Open);
        assert_eq!(f.raffle.pending_request(), None);
    }

    #[test]
    fn perform_upkeep_flips_to_calculating_and_blocks_entry() {
        let f = fixture();
        f.raffle.enter("alice", FEE).unwrap();
        f.clock.advance(INTERVAL + 1);

        let request_id = f.raffle.perform_upkeep().unwrap();
        assert!(request_id > 0);
        assert_eq!(f.raffle.state(), RaffleState::Calculating);
        assert_eq!(f.raffle.pending_request(), Some(request_id));

        let err = f.raffle.enter("bob", FEE).unwrap_err();
        assert_eq!(err.code(), "NotOpen");
        assert_eq!(f.raffle.player_count(), 1);

        // duplicate trigger is rejected while a request is outstanding
        let err = f.raffle.perform_upkeep().unwrap_err();
        assert_eq!(err.code(), "UpkeepNotNeeded");
    }

    #[tokio::test]
    async fn fulfill_rejects_unknown_request() {
        let f = fixture();
        f.raffle.enter("alice", FEE).unwrap();
        f.clock.advance(INTERVAL + 1);
        let request_id = f.raffle.perform_upkeep().unwrap();

        let err = f
            .raffle
            .fulfill_random_words(request_id + 1, &[0])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UnknownRequest");

        // nothing changed; the real request still settles
        assert_eq!(f.raffle.state(), RaffleState::Calculating);
        assert_eq!(f.raffle.player_count(), 1);
        f.raffle
            .fulfill_random_words(request_id, &[0])
            .await
            .unwrap();
        assert_eq!(f.raffle.recent_winner().unwrap(), "alice");
    }

    #[tokio::test]
    async fn fulfill_rejects_while_open() {
        let f = fixture();
        let err = f.raffle.fulfill_random_words(1, &[0]).await.unwrap_err();
        assert_eq!(err.code(), "UnknownRequest");
    }

    #[tokio::test]
    async fn winner_selection_is_word_mod_count() {
        // K players, word R: index is R mod K
        for (word, expected) in [(3u64, "alice"), (2u64, "carol")] {
            let f = fixture();
            for name in ["alice", "bob", "carol"] {
                f.raffle.enter(name, FEE).unwrap();
            }
            f.clock.advance(INTERVAL + 1);
            let request_id = f.raffle.perform_upkeep().unwrap();
            f.raffle
                .fulfill_random_words(request_id, &[word])
                .await
                .unwrap();
            assert_eq!(f.raffle.recent_winner().unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn full_round_resets_and_pays_single_player() {
        let f = fixture();
        f.raffle.enter("alice", FEE).unwrap();
        f.clock.advance(INTERVAL + 1);
        let started_at = f.raffle.last_timestamp();

        let request_id = f.raffle.perform_upkeep().unwrap();
        assert!(request_id > 0);

        f.raffle
            .fulfill_random_words(request_id, &[7_777])
            .await
            .unwrap();

        assert_eq!(f.raffle.recent_winner().unwrap(), "alice");
        assert_eq!(f.raffle.player_count(), 0);
        assert_eq!(f.raffle.state(), RaffleState::Open);
        assert_eq!(f.raffle.pending_request(), None);
        assert_eq!(f.raffle.pot(), 0);
        assert!(f.raffle.last_timestamp() > started_at);
        assert_eq!(f.bank.balance_of("alice"), FEE);
    }

    #[tokio::test]
    async fn full_round_emits_all_three_events() {
        let f = fixture();
        let mut rx = f.raffle.subscribe();

        f.raffle.enter("alice", FEE).unwrap();
        f.clock.advance(INTERVAL + 1);
        let request_id = f.raffle.perform_upkeep().unwrap();
        f.raffle
            .fulfill_random_words(request_id, &[1])
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            RaffleEvent::Entered {
                player: "alice".to_string(),
                fee_paid: FEE,
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RaffleEvent::RandomnessRequested { request_id }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RaffleEvent::WinnerPicked {
                winner: "alice".to_string(),
                amount: FEE,
            }
        );
    }

    #[tokio::test]
    async fn failed_payout_keeps_committed_bookkeeping_and_restores_pot() {
        let (raffle, clock) = fixture_with_sink(Arc::new(RejectingSink));
        raffle.enter("alice", FEE).unwrap();
        raffle.enter("bob", FEE).unwrap();
        clock.advance(INTERVAL + 1);
        let request_id = raffle.perform_upkeep().unwrap();

        let err = raffle
            .fulfill_random_words(request_id, &[0])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TransferFailed");

        // round bookkeeping stays committed
        assert_eq!(raffle.state(), RaffleState::Open);
        assert_eq!(raffle.player_count(), 0);
        assert_eq!(raffle.pending_request(), None);
        assert_eq!(raffle.recent_winner().unwrap(), "alice");
        // the pot is back under treasury accounting for a later retry
        assert_eq!(raffle.pot(), 2 * FEE);
    }

    #[tokio::test]
    async fn consecutive_rounds_reuse_the_machine() {
        let f = fixture();
        for round in 0..3u64 {
            let player = format!("player-{round}");
            f.raffle.enter(player.clone(), FEE).unwrap();
            f.clock.advance(INTERVAL + 1);
            let request_id = f.raffle.perform_upkeep().unwrap();
            f.raffle
                .fulfill_random_words(request_id, &[round])
                .await
                .unwrap();
            assert_eq!(f.raffle.recent_winner().unwrap(), player);
            assert_eq!(f.raffle.state(), RaffleState::Open);
            assert_eq!(f.bank.balance_of(&player), FEE);
        }
    }
}
