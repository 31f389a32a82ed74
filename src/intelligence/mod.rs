pub mod age_resolver;
pub mod classifier;
pub mod first_seen;

pub use age_resolver::{AccountAge, AgeResolver};
pub use classifier::RiskThresholds;
pub use first_seen::{FirstSeenLookup, LookupError, SimulatedLookup};
