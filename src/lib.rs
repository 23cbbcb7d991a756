//! Tombola - automated, provably fair raffle service
//!
//! Participants pay a fixed entrance fee into a shared pot. A keeper task
//! watches the upkeep predicate (open + interval elapsed + players + funds)
//! and closes entry by requesting randomness from the VRF oracle; the
//! oracle callback selects the winner, pays out the pot, and reopens the
//! raffle. The cycle runs for the lifetime of the process.

pub mod api;
pub mod clock;
pub mod config;
pub mod errors;
pub mod history;
pub mod metrics;
pub mod oracle;
pub mod raffle;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigLoader};
pub use errors::{ConfigError, OracleError, RaffleError, StoreError, TransferError};
pub use oracle::{
    RandomnessConsumer, RandomnessGateway, RandomnessRequest, VrfBeacon, VrfCoordinator,
};
pub use raffle::{
    Amount, EntryRegistry, EventBus, MemoryBank, PayoutSink, Raffle, RaffleEvent, RaffleParams,
    RaffleState, RequestId, Treasury, UpkeepStatus,
};
