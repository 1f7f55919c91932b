//! Chain-wide statistics reported alongside the profile.
//!
//! - Put/call open-interest ratio
//! - ATM implied volatility
//! - Expected move from the ATM straddle mid

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::strategy::StrategyConfig;
use crate::data::{ChainSnapshot, OptionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    /// Put OI / call OI over every contract. `None` without call OI.
    pub put_call_ratio: Option<f64>,
    /// Spot rounded to the strike grid.
    pub atm_strike: Decimal,
    /// Mean ATM implied volatility, percent.
    pub atm_iv_pct: Option<f64>,
    /// ATM call mid + ATM put mid.
    pub expected_move: Option<Decimal>,
}

impl ChainStats {
    pub fn compute(snapshot: &ChainSnapshot, strategy: &StrategyConfig) -> Self {
        let put_oi: i64 = snapshot.puts().map(|c| c.open_interest).sum();
        let call_oi: i64 = snapshot.calls().map(|c| c.open_interest).sum();
        let put_call_ratio = if call_oi > 0 {
            Some(round_to(put_oi as f64 / call_oi as f64, 2))
        } else {
            None
        };

        let atm_strike = strategy.round_strike(snapshot.underlying_price, snapshot.underlying_price);
        let atm: Vec<_> = [OptionType::Call, OptionType::Put]
            .iter()
            .filter_map(|t| snapshot.contract_at(atm_strike, *t))
            .collect();

        let (atm_iv_pct, expected_move) = if atm.is_empty() {
            (None, None)
        } else {
            let mean_iv = atm.iter().map(|c| c.implied_vol).sum::<f64>() / atm.len() as f64;
            let straddle: Decimal = atm.iter().map(|c| c.mid()).sum();
            (Some(round_to(mean_iv * 100.0, 2)), Some(straddle.round_dp(2)))
        };

        Self {
            put_call_ratio,
            atm_strike,
            atm_iv_pct,
            expected_move,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
