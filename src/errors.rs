//! Error types for the tombola raffle service
//!
//! Every user-facing failure carries a stable machine-readable reason code
//! alongside its human-readable message; the HTTP layer surfaces the code
//! verbatim so external automation can match on it.

use crate::raffle::{Amount, RaffleState, RequestId};

/// Failures raised by the raffle state machine.
#[derive(Debug, thiserror::Error)]
pub enum RaffleError {
    #[error("entrance fee below minimum: paid {paid}, required {required}")]
    NotEnoughFee { paid: Amount, required: Amount },

    #[error("raffle is not open for entries")]
    NotOpen,

    #[error("upkeep not needed (balance: {balance}, players: {players}, state: {state:?})")]
    UpkeepNotNeeded {
        balance: Amount,
        players: usize,
        state: RaffleState,
    },

    #[error("no outstanding randomness request with id {0}")]
    UnknownRequest(RequestId),

    #[error("player index {index} out of range (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("payout transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl RaffleError {
    /// Stable reason code surfaced to external callers.
    pub fn code(&self) -> &'static str {
        match self {
            RaffleError::NotEnoughFee { .. } => "NotEnoughEthEntered",
            RaffleError::NotOpen => "NotOpen",
            RaffleError::UpkeepNotNeeded { .. } => "UpkeepNotNeeded",
            RaffleError::UnknownRequest(_) => "UnknownRequest",
            RaffleError::IndexOutOfRange { .. } => "IndexOutOfRange",
            RaffleError::TransferFailed(_) => "TransferFailed",
            RaffleError::Oracle(e) => e.code(),
        }
    }
}

/// Rejection from the underlying transfer mechanism during payout.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransferError(pub String);

/// Failures raised by the randomness oracle.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("nonexistent request")]
    NonexistentRequest(RequestId),

    #[error("empty randomness payload")]
    EmptyRandomness,

    #[error("vrf operation failed: {0}")]
    Vrf(String),
}

impl OracleError {
    pub fn code(&self) -> &'static str {
        match self {
            OracleError::NonexistentRequest(_) => "nonexistent request",
            OracleError::EmptyRandomness => "EmptyRandomness",
            OracleError::Vrf(_) => "VrfFailure",
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("missing required field: {0}")]
    MissingRequired(String),

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Round history storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open store: {0}")]
    OpenFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}
