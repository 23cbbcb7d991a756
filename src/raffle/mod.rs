pub mod events;
pub mod machine;
pub mod registry;
pub mod treasury;

/// Monetary amounts in base units (lamports).
pub type Amount = u64;

/// Handle identifying a randomness request issued to the oracle.
pub type RequestId = u64;

pub use events::{EventBus, RaffleEvent};
pub use machine::{Raffle, RaffleParams, RaffleState, UpkeepStatus};
pub use registry::EntryRegistry;
pub use treasury::{MemoryBank, PayoutSink, Treasury};
