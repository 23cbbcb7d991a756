pub mod coordinator;
pub mod vrf;

pub use coordinator::{
    RandomnessConsumer, RandomnessGateway, RandomnessRequest, VrfCoordinator,
};
pub use vrf::{VrfBeacon, VrfDraw};
