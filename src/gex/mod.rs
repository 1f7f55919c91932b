//! Gamma-exposure aggregation and profile building.
//!
//! - Contract eligibility filtering
//! - Per-strike signed exposure, open interest and volume
//! - Band-limited profile with cumulative curve, walls and flip strike

pub mod aggregator;
pub mod filter;
pub mod profile;

pub use aggregator::{contract_exposure, notional_scale, StrikeAggregate, StrikeBook};
pub use filter::{eligible_contracts, ineligible_count};
pub use profile::{GexProfile, ProfileBuilder, ProfileConfig, ProfileError};
