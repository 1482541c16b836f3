pub mod types;
pub mod vrf_engine;
pub mod lifecycle;
pub mod processor;
pub mod test_framework;

pub use types::*;
pub use vrf_engine::{RandomGenerator, RandomnessOracle, SeededOracle, VrfBundle, VrfOracle};
pub use processor::BatchReceipt;
