//! Per-strike aggregation.
//!
//! Exposure convention: dollar gamma per 1% move, in billions.
//!
//! `exposure = gamma × OI × 100 × spot² / 1e9 × sign`
//!
//! with `sign = +1` for calls and `-1` for puts. `notional_scale` is the only
//! place the unit is defined.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{ChainSnapshot, OptionContract};

/// Shares per contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Converts dollar gamma into billions.
const BILLIONS: f64 = 1e9;

/// Scale factor turning `gamma × OI × multiplier` into billions of notional.
pub fn notional_scale(spot: f64) -> f64 {
    spot * spot / BILLIONS
}

/// Signed exposure of one contract. Zero for ineligible contracts.
pub fn contract_exposure(contract: &OptionContract, spot: f64) -> f64 {
    if !contract.is_gex_eligible() {
        return 0.0;
    }
    let gamma = contract.gamma.unwrap_or(0.0);
    gamma
        * contract.open_interest as f64
        * CONTRACT_MULTIPLIER
        * notional_scale(spot)
        * contract.option_type.exposure_sign()
}

/// Everything known about one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeAggregate {
    pub strike: Decimal,
    /// Signed exposure, billions.
    pub net_gex: f64,
    /// Call + put open interest, eligible or not.
    pub total_open_interest: i64,
    /// Call + put volume, eligible or not.
    pub total_volume: i64,
    /// At least one eligible contract lists at this strike.
    pub has_exposure: bool,
}

impl StrikeAggregate {
    fn empty(strike: Decimal) -> Self {
        Self {
            strike,
            net_gex: 0.0,
            total_open_interest: 0,
            total_volume: 0,
            has_exposure: false,
        }
    }
}

/// Aggregates keyed by strike, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrikeBook {
    aggregates: BTreeMap<Decimal, StrikeAggregate>,
}

impl StrikeBook {
    /// Reduce a snapshot to one aggregate per distinct strike.
    pub fn from_snapshot(snapshot: &ChainSnapshot) -> Self {
        let spot = snapshot.spot();
        let mut aggregates: BTreeMap<Decimal, StrikeAggregate> = BTreeMap::new();

        for contract in &snapshot.contracts {
            let entry = aggregates
                .entry(contract.strike)
                .or_insert_with(|| StrikeAggregate::empty(contract.strike));

            if contract.is_gex_eligible() {
                entry.net_gex += contract_exposure(contract, spot);
                entry.has_exposure = true;
            }
            entry.total_open_interest += contract.open_interest;
            entry.total_volume += contract.volume;
        }

        Self { aggregates }
    }

    pub fn get(&self, strike: Decimal) -> Option<&StrikeAggregate> {
        self.aggregates.get(&strike)
    }

    /// All strikes, ascending.
    pub fn iter(&self) -> impl Iterator<Item = &StrikeAggregate> {
        self.aggregates.values()
    }

    /// Strikes carrying exposure, ascending.
    pub fn exposed(&self) -> impl Iterator<Item = &StrikeAggregate> {
        self.aggregates.values().filter(|a| a.has_exposure)
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    /// Sum of exposure over every strike.
    pub fn total_gex(&self) -> f64 {
        self.exposed().map(|a| a.net_gex).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn contract(strike: Decimal, option_type: OptionType, gamma: Option<f64>, oi: i64, volume: i64) -> OptionContract {
        OptionContract {
            strike,
            option_type,
            gamma,
            open_interest: oi,
            volume,
            bid: dec!(1),
            ask: dec!(1.1),
            delta: 0.5,
            implied_vol: 0.2,
        }
    }

    fn snapshot(contracts: Vec<OptionContract>) -> ChainSnapshot {
        ChainSnapshot::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(), dec!(100)).with_contracts(contracts)
    }

    #[test]
    fn test_single_call_exposure() {
        // 0.05 × 1000 × 100 × 100² / 1e9 = 0.05
        let book = StrikeBook::from_snapshot(&snapshot(vec![contract(
            dec!(100),
            OptionType::Call,
            Some(0.05),
            1000,
            0,
        )]));
        let agg = book.get(dec!(100)).unwrap();
        assert!((agg.net_gex - 0.05).abs() < 1e-12);
        assert!(agg.has_exposure);
    }

    #[test]
    fn test_put_cancels_call() {
        let book = StrikeBook::from_snapshot(&snapshot(vec![
            contract(dec!(100), OptionType::Call, Some(0.05), 1000, 0),
            contract(dec!(100), OptionType::Put, Some(0.05), 1000, 0),
        ]));
        assert_eq!(book.len(), 1);
        assert!(book.get(dec!(100)).unwrap().net_gex.abs() < 1e-12);
    }

    #[test]
    fn test_ineligible_still_counts_oi_and_volume() {
        let book = StrikeBook::from_snapshot(&snapshot(vec![
            contract(dec!(95), OptionType::Put, None, 700, 40),
            contract(dec!(100), OptionType::Call, Some(0.01), 300, 25),
            contract(dec!(100), OptionType::Put, Some(0.02), 0, 10),
        ]));

        let p95 = book.get(dec!(95)).unwrap();
        assert_eq!(p95.total_open_interest, 700);
        assert_eq!(p95.total_volume, 40);
        assert!(!p95.has_exposure);
        assert_eq!(p95.net_gex, 0.0);

        let s100 = book.get(dec!(100)).unwrap();
        assert_eq!(s100.total_open_interest, 300);
        assert_eq!(s100.total_volume, 35);
        assert_eq!(book.exposed().count(), 1);
    }

    #[test]
    fn test_sign_symmetry() {
        let strikes = [dec!(90), dec!(95), dec!(100), dec!(105), dec!(110)];
        let calls: Vec<_> = strikes
            .iter()
            .enumerate()
            .map(|(i, s)| contract(*s, OptionType::Call, Some(0.01 * (i + 1) as f64), 100 * (i as i64 + 1), 0))
            .collect();
        let puts: Vec<_> = calls
            .iter()
            .map(|c| OptionContract {
                option_type: OptionType::Put,
                ..c.clone()
            })
            .collect();

        let call_total = StrikeBook::from_snapshot(&snapshot(calls)).total_gex();
        let put_total = StrikeBook::from_snapshot(&snapshot(puts)).total_gex();
        assert!(call_total > 0.0);
        assert!((call_total + put_total).abs() < 1e-12);
    }
}
