//! API request and response models

use crate::history::RoundRecord;
use crate::raffle::{Amount, RaffleState, RequestId, UpkeepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) fn datetime_from_unix(secs: u64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Full raffle status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: RaffleState,
    pub entrance_fee: Amount,
    pub interval_secs: u64,
    pub player_count: usize,
    pub pot: Amount,
    pub last_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<RequestId>,
    pub version: String,
}

/// Request to enter the current round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnterRequest {
    pub player: String,
    pub fee_paid: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnterResponse {
    pub player_count: usize,
    pub pot: Amount,
}

/// Upkeep predicate with its component conjuncts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpkeepResponse {
    pub upkeep_needed: bool,
    #[serde(flatten)]
    pub status: UpkeepStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformUpkeepResponse {
    pub request_id: RequestId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayersResponse {
    pub count: usize,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub index: usize,
    pub player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerResponse {
    pub recent_winner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillResponse {
    pub request_id: RequestId,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundsResponse {
    pub rounds: Vec<RoundSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub request_id: RequestId,
    pub winner: String,
    pub pot: Amount,
    pub player_count: usize,
    pub decided_at: DateTime<Utc>,
    pub vrf_output: String,
}

impl From<RoundRecord> for RoundSummary {
    fn from(record: RoundRecord) -> Self {
        Self {
            request_id: record.request_id,
            winner: record.winner,
            pot: record.pot,
            player_count: record.player_count,
            decided_at: datetime_from_unix(record.decided_at),
            vrf_output: record.vrf_output,
        }
    }
}
