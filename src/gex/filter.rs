//! Contract eligibility for exposure accumulation.
//!
//! Filtering is routine, not a failure: a contract without a quoted gamma or
//! without open interest simply does not contribute exposure. It still
//! counts toward open-interest and volume totals.

use crate::data::{ChainSnapshot, OptionContract};

/// Contracts from `snapshot` that contribute to GEX.
pub fn eligible_contracts(snapshot: &ChainSnapshot) -> impl Iterator<Item = &OptionContract> {
    snapshot.contracts.iter().filter(|c| c.is_gex_eligible())
}

/// Number of contracts excluded from GEX accumulation.
pub fn ineligible_count(snapshot: &ChainSnapshot) -> usize {
    snapshot.contracts.iter().filter(|c| !c.is_gex_eligible()).count()
}
