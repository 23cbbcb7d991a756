//! Background services closing the raffle's control loop
//!
//! Two long-running tokio tasks: the keeper, which periodically evaluates
//! the upkeep predicate and triggers the round closure, and the fulfillment
//! worker, which plays the oracle infrastructure by delivering the VRF
//! callback after a configurable delay.

use crate::errors::{OracleError, RaffleError};
use crate::history::{RoundRecord, RoundStore};
use crate::metrics::MetricsRegistry;
use crate::oracle::VrfCoordinator;
use crate::raffle::{Raffle, RequestId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The automation agent: polls the upkeep predicate and triggers rounds.
pub struct UpkeepService {
    raffle: Arc<Raffle>,
    metrics: Arc<MetricsRegistry>,
    poll_interval: Duration,
}

impl UpkeepService {
    pub fn new(
        raffle: Arc<Raffle>,
        metrics: Arc<MetricsRegistry>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            raffle,
            metrics,
            poll_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "upkeep service started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                _ = shutdown.changed() => {
                    info!("upkeep service stopping");
                    break;
                }
            }
        }
    }

    fn tick(&self) {
        if !self.raffle.check_upkeep().needed() {
            return;
        }
        match self.raffle.perform_upkeep() {
            Ok(request_id) => {
                MetricsRegistry::inc(&self.metrics.randomness_requests_total);
                info!(request_id, "entry closed, randomness requested");
            }
            // another trigger won the race between check and perform
            Err(RaffleError::UpkeepNotNeeded { .. }) => {
                debug!("upkeep no longer needed at trigger time");
            }
            Err(e) => warn!("upkeep trigger failed: {e}"),
        }
    }
}

/// Plays the oracle infrastructure: delivers each requested callback once,
/// after the configured latency, then records the settled round.
pub struct FulfillmentService {
    coordinator: Arc<VrfCoordinator>,
    raffle: Arc<Raffle>,
    rounds: Option<Arc<RoundStore>>,
    metrics: Arc<MetricsRegistry>,
    delay: Duration,
}

impl FulfillmentService {
    pub fn new(
        coordinator: Arc<VrfCoordinator>,
        raffle: Arc<Raffle>,
        rounds: Option<Arc<RoundStore>>,
        metrics: Arc<MetricsRegistry>,
        delay: Duration,
    ) -> Self {
        Self {
            coordinator,
            raffle,
            rounds,
            metrics,
            delay,
        }
    }

    pub async fn run(
        self,
        mut requests: mpsc::UnboundedReceiver<RequestId>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(delay_ms = self.delay.as_millis() as u64, "fulfillment service started");
        loop {
            tokio::select! {
                maybe_id = requests.recv() => {
                    let Some(request_id) = maybe_id else { break };
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    self.fulfill(request_id).await;
                }
                _ = shutdown.changed() => {
                    info!("fulfillment service stopping");
                    break;
                }
            }
        }
    }

    async fn fulfill(&self, request_id: RequestId) {
        let pot = self.raffle.pot();
        let player_count = self.raffle.player_count();

        match self.coordinator.fulfill(request_id, self.raffle.as_ref()).await {
            Ok(draw) => {
                MetricsRegistry::inc(&self.metrics.rounds_completed_total);
                let Some(winner) = self.raffle.recent_winner() else {
                    return;
                };
                info!(request_id, %winner, pot, "round settled");
                self.record_round(request_id, winner, pot, player_count, &draw);
            }
            Err(RaffleError::TransferFailed(reason)) => {
                MetricsRegistry::inc(&self.metrics.payout_failures_total);
                error!(request_id, %reason, "payout rejected after round bookkeeping committed");
            }
            // someone forced fulfillment over the oracle endpoint first
            Err(RaffleError::Oracle(OracleError::NonexistentRequest(_))) => {
                debug!(request_id, "request already fulfilled");
            }
            Err(e) => error!(request_id, "fulfillment failed: {e}"),
        }
    }

    fn record_round(
        &self,
        request_id: RequestId,
        winner: String,
        pot: u64,
        player_count: usize,
        draw: &crate::oracle::VrfDraw,
    ) {
        let Some(rounds) = &self.rounds else { return };
        let record = RoundRecord {
            round_id: Uuid::new_v4().to_string(),
            request_id,
            winner,
            pot,
            player_count,
            decided_at: self.raffle.last_timestamp(),
            vrf_output: draw.output.clone(),
            vrf_proof: draw.proof.clone(),
            vrf_public_key: draw.public_key.clone(),
        };
        if let Err(e) = rounds.store_round(&record) {
            warn!(request_id, "failed to record settled round: {e}");
        }
    }
}
