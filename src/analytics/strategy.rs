//! Credit spread selection from a GEX profile.
//!
//! Picks one spread family from total exposure:
//! - Bullish (GEX > 3): bull put spread anchored at the put wall
//! - Bearish (GEX < -3): bear call spread anchored at the call wall
//! - Neutral: iron condor with one spread on each side of spot
//!
//! Legs are priced from the snapshot (sell at bid, buy at ask). Probability
//! of profit is a delta approximation, not a pricing model: `1 - |Δshort|`
//! for one spread, `1 - |Δput| - |Δcall|` for the condor, clamped to
//! [0, 100] percent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{ChainSnapshot, OptionContract, OptionType};
use crate::gex::GexProfile;
use crate::regime::{Classification, GammaRegime, Signal};

/// Spread family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyName {
    BullPutSpread,
    BearCallSpread,
    IronCondor,
}

impl StrategyName {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BullPutSpread => "Bull Put Spread",
            Self::BearCallSpread => "Bear Call Spread",
            Self::IronCondor => "Iron Condor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegAction {
    Sell,
    Buy,
}

impl LegAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::Buy => "buy",
        }
    }
}

/// One leg of a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadLeg {
    pub action: LegAction,
    pub strike: Decimal,
    pub option_type: OptionType,
}

impl SpreadLeg {
    pub fn sell(strike: Decimal, option_type: OptionType) -> Self {
        Self {
            action: LegAction::Sell,
            strike,
            option_type,
        }
    }

    pub fn buy(strike: Decimal, option_type: OptionType) -> Self {
        Self {
            action: LegAction::Buy,
            strike,
            option_type,
        }
    }
}

/// A recommended spread. Pricing fields are `None` when a leg is not
/// listed in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub name: StrategyName,
    pub legs: Vec<SpreadLeg>,
    pub rationale: String,
    /// Net credit per share (sell bids minus buy asks).
    pub estimated_credit: Option<Decimal>,
    /// Percent, in [0, 100].
    pub probability_of_profit: Option<f64>,
    pub signal: Signal,
    pub regime: GammaRegime,
}

impl StrategyRecommendation {
    /// Whether every leg was found and priced.
    pub fn is_priced(&self) -> bool {
        self.estimated_credit.is_some() && self.probability_of_profit.is_some()
    }

    /// Short strikes, in leg order.
    pub fn short_strikes(&self) -> Vec<Decimal> {
        self.legs
            .iter()
            .filter(|l| l.action == LegAction::Sell)
            .map(|l| l.strike)
            .collect()
    }
}

/// Strategy selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// |total GEX| beyond which a directional spread is chosen.
    pub directional_gex: f64,
    /// Short-strike offset from spot when the relevant wall is unusable.
    pub directional_offset: Decimal,
    /// Condor short-strike offset from spot when a wall is unusable.
    pub condor_offset: Decimal,
    /// Distance between short and long strikes.
    pub wing_width: Decimal,
    /// Strike rounding increment.
    pub strike_increment: Decimal,
    /// Strike rounding increment for low-priced underlyings.
    pub fine_strike_increment: Decimal,
    /// Spot below which the fine increment applies.
    pub fine_increment_below: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            directional_gex: 3.0,
            directional_offset: Decimal::from(5),
            condor_offset: Decimal::from(25),
            wing_width: Decimal::from(10),
            strike_increment: Decimal::from(5),
            fine_strike_increment: Decimal::ONE,
            fine_increment_below: Decimal::from(200),
        }
    }
}

impl StrategyConfig {
    /// Round a price level to the strike grid for this spot.
    pub fn round_strike(&self, level: Decimal, spot: Decimal) -> Decimal {
        let increment = if spot < self.fine_increment_below {
            self.fine_strike_increment
        } else {
            self.strike_increment
        };
        if increment.is_zero() {
            return level;
        }
        (level / increment).round() * increment
    }
}

/// Priced vertical spread.
#[derive(Debug, Clone, Copy)]
struct SidePricing {
    credit: Decimal,
    short_delta: f64,
}

/// Strategy recommender.
pub struct StrategyRecommender {
    config: StrategyConfig,
}

impl StrategyRecommender {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Recommend a spread for the snapshot's profile.
    pub fn recommend(
        &self,
        snapshot: &ChainSnapshot,
        profile: &GexProfile,
        classification: Classification,
    ) -> StrategyRecommendation {
        let total_gex = profile.total_gex;

        if total_gex > self.config.directional_gex {
            self.bull_put(snapshot, profile, classification)
        } else if total_gex < -self.config.directional_gex {
            self.bear_call(snapshot, profile, classification)
        } else {
            self.iron_condor(snapshot, profile, classification)
        }
    }

    fn put_anchor(&self, put_wall: Option<Decimal>, price: Decimal, offset: Decimal) -> Decimal {
        match put_wall {
            Some(w) if w < price => w,
            _ => price - offset,
        }
    }

    fn call_anchor(&self, call_wall: Option<Decimal>, price: Decimal, offset: Decimal) -> Decimal {
        match call_wall {
            Some(w) if w > price => w,
            _ => price + offset,
        }
    }

    fn bull_put(
        &self,
        snapshot: &ChainSnapshot,
        profile: &GexProfile,
        classification: Classification,
    ) -> StrategyRecommendation {
        let price = snapshot.underlying_price;
        let anchor = self.put_anchor(profile.put_wall, price, self.config.directional_offset);
        let short = self.config.round_strike(anchor, price);
        let long = short - self.config.wing_width;

        let pricing = price_vertical(snapshot, short, long, OptionType::Put);

        StrategyRecommendation {
            name: StrategyName::BullPutSpread,
            legs: vec![SpreadLeg::sell(short, OptionType::Put), SpreadLeg::buy(long, OptionType::Put)],
            rationale: format!(
                "Positive GEX (${:.2}B). Put Wall support at {}.",
                profile.total_gex,
                fmt_strike(profile.put_wall)
            ),
            estimated_credit: pricing.map(|p| p.credit.round_dp(2)),
            probability_of_profit: pricing.map(|p| pop_percent(1.0 - p.short_delta.abs())),
            signal: classification.signal,
            regime: classification.regime,
        }
    }

    fn bear_call(
        &self,
        snapshot: &ChainSnapshot,
        profile: &GexProfile,
        classification: Classification,
    ) -> StrategyRecommendation {
        let price = snapshot.underlying_price;
        let anchor = self.call_anchor(profile.call_wall, price, self.config.directional_offset);
        let short = self.config.round_strike(anchor, price);
        let long = short + self.config.wing_width;

        let pricing = price_vertical(snapshot, short, long, OptionType::Call);

        StrategyRecommendation {
            name: StrategyName::BearCallSpread,
            legs: vec![SpreadLeg::sell(short, OptionType::Call), SpreadLeg::buy(long, OptionType::Call)],
            rationale: format!(
                "Negative GEX (${:.2}B). Call Wall resistance at {}.",
                profile.total_gex,
                fmt_strike(profile.call_wall)
            ),
            estimated_credit: pricing.map(|p| p.credit.round_dp(2)),
            probability_of_profit: pricing.map(|p| pop_percent(1.0 - p.short_delta.abs())),
            signal: classification.signal,
            regime: classification.regime,
        }
    }

    fn iron_condor(
        &self,
        snapshot: &ChainSnapshot,
        profile: &GexProfile,
        classification: Classification,
    ) -> StrategyRecommendation {
        let price = snapshot.underlying_price;
        let offset = self.config.condor_offset;

        let put_short = self
            .config
            .round_strike(self.put_anchor(profile.put_wall, price, offset), price);
        let call_short = self
            .config
            .round_strike(self.call_anchor(profile.call_wall, price, offset), price);
        let put_long = put_short - self.config.wing_width;
        let call_long = call_short + self.config.wing_width;

        let put_side = price_vertical(snapshot, put_short, put_long, OptionType::Put);
        let call_side = price_vertical(snapshot, call_short, call_long, OptionType::Call);

        let (estimated_credit, probability_of_profit) = match (put_side, call_side) {
            (Some(p), Some(c)) => (
                Some((p.credit + c.credit).round_dp(2)),
                Some(pop_percent(1.0 - p.short_delta.abs() - c.short_delta.abs())),
            ),
            _ => (None, None),
        };

        StrategyRecommendation {
            name: StrategyName::IronCondor,
            legs: vec![
                SpreadLeg::sell(put_short, OptionType::Put),
                SpreadLeg::buy(put_long, OptionType::Put),
                SpreadLeg::sell(call_short, OptionType::Call),
                SpreadLeg::buy(call_long, OptionType::Call),
            ],
            rationale: format!(
                "Neutral GEX (${:.2}B). Range: {}-{}.",
                profile.total_gex,
                put_short.normalize(),
                call_short.normalize()
            ),
            estimated_credit,
            probability_of_profit,
            signal: classification.signal,
            regime: classification.regime,
        }
    }
}

/// Price a short/long vertical. `None` if either leg is not listed.
fn price_vertical(
    snapshot: &ChainSnapshot,
    short_strike: Decimal,
    long_strike: Decimal,
    option_type: OptionType,
) -> Option<SidePricing> {
    let short: &OptionContract = snapshot.contract_at(short_strike, option_type)?;
    let long: &OptionContract = snapshot.contract_at(long_strike, option_type)?;

    Some(SidePricing {
        credit: short.bid - long.ask,
        short_delta: short.delta,
    })
}

/// Fraction to percent, clamped to [0, 100], one decimal.
fn pop_percent(fraction: f64) -> f64 {
    let pct = (fraction * 100.0).clamp(0.0, 100.0);
    (pct * 10.0).round() / 10.0
}

fn fmt_strike(strike: Option<Decimal>) -> String {
    strike.map_or_else(|| "N/A".to_string(), |s| s.normalize().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gex::StrikeAggregate;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn leg(strike: Decimal, option_type: OptionType, bid: Decimal, ask: Decimal, delta: f64) -> OptionContract {
        OptionContract {
            strike,
            option_type,
            gamma: Some(0.01),
            open_interest: 100,
            volume: 10,
            bid,
            ask,
            delta,
            implied_vol: 0.2,
        }
    }

    fn profile(total_gex: f64, call_wall: Option<Decimal>, put_wall: Option<Decimal>) -> GexProfile {
        GexProfile {
            strikes: vec![StrikeAggregate {
                strike: dec!(100),
                net_gex: total_gex,
                total_open_interest: 100,
                total_volume: 10,
                has_exposure: true,
            }],
            cumulative: vec![total_gex],
            total_gex,
            call_wall,
            put_wall,
            flip_strike: dec!(100),
            max_oi_strike: Some(dec!(100)),
        }
    }

    fn snapshot(price: Decimal, contracts: Vec<OptionContract>) -> ChainSnapshot {
        ChainSnapshot::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(), price).with_contracts(contracts)
    }

    fn classification() -> Classification {
        Classification {
            regime: GammaRegime::PositiveGamma,
            signal: Signal::Buy,
        }
    }

    fn recommender() -> StrategyRecommender {
        StrategyRecommender::new(StrategyConfig::default())
    }

    #[test]
    fn test_round_strike() {
        let config = StrategyConfig::default();
        assert_eq!(config.round_strike(dec!(4812.4), dec!(4800)), dec!(4810));
        assert_eq!(config.round_strike(dec!(4813), dec!(4800)), dec!(4815));
        assert_eq!(config.round_strike(dec!(89.6), dec!(100)), dec!(90));
        assert_eq!(config.round_strike(dec!(90), dec!(100)), dec!(90));
    }

    #[test]
    fn test_bullish_anchors_on_put_wall() {
        let snap = snapshot(
            dec!(100),
            vec![
                leg(dec!(90), OptionType::Put, dec!(1.20), dec!(1.30), -0.18),
                leg(dec!(80), OptionType::Put, dec!(0.30), dec!(0.40), -0.05),
            ],
        );
        let rec = recommender().recommend(&snap, &profile(5.0, None, Some(dec!(90))), classification());

        assert_eq!(rec.name, StrategyName::BullPutSpread);
        assert_eq!(
            rec.legs,
            vec![SpreadLeg::sell(dec!(90), OptionType::Put), SpreadLeg::buy(dec!(80), OptionType::Put)]
        );
        assert_eq!(rec.estimated_credit, Some(dec!(0.80)));
        assert_eq!(rec.probability_of_profit, Some(82.0));
        assert_eq!(rec.signal, Signal::Buy);
        assert!(rec.rationale.contains("Put Wall support at 90"));
    }

    #[test]
    fn test_bullish_ignores_wall_above_spot() {
        let snap = snapshot(dec!(4800), vec![]);
        let rec = recommender().recommend(&snap, &profile(5.0, None, Some(dec!(4850))), classification());
        // 4800 - 5 = 4795 on the $5 grid
        assert_eq!(rec.short_strikes(), vec![dec!(4795)]);
        assert_eq!(rec.legs[1].strike, dec!(4785));
        assert!(!rec.is_priced());
    }

    #[test]
    fn test_bearish_mirrors() {
        let snap = snapshot(
            dec!(4800),
            vec![
                leg(dec!(4825), OptionType::Call, dec!(3.10), dec!(3.30), 0.22),
                leg(dec!(4835), OptionType::Call, dec!(1.50), dec!(1.70), 0.12),
            ],
        );
        let rec = recommender().recommend(&snap, &profile(-4.0, Some(dec!(4823)), None), classification());

        assert_eq!(rec.name, StrategyName::BearCallSpread);
        assert_eq!(rec.short_strikes(), vec![dec!(4825)]);
        assert_eq!(rec.legs[1], SpreadLeg::buy(dec!(4835), OptionType::Call));
        assert_eq!(rec.estimated_credit, Some(dec!(1.40)));
        assert_eq!(rec.probability_of_profit, Some(78.0));
    }

    #[test]
    fn test_missing_leg_leaves_pricing_unavailable() {
        let snap = snapshot(
            dec!(100),
            vec![leg(dec!(90), OptionType::Put, dec!(1.20), dec!(1.30), -0.18)],
        );
        let rec = recommender().recommend(&snap, &profile(5.0, None, Some(dec!(90))), classification());

        assert_eq!(rec.name, StrategyName::BullPutSpread);
        assert_eq!(rec.legs.len(), 2);
        assert_eq!(rec.estimated_credit, None);
        assert_eq!(rec.probability_of_profit, None);
    }

    #[test]
    fn test_iron_condor_combines_sides() {
        let snap = snapshot(
            dec!(100),
            vec![
                leg(dec!(90), OptionType::Put, dec!(0.90), dec!(1.00), -0.15),
                leg(dec!(80), OptionType::Put, dec!(0.20), dec!(0.25), -0.04),
                leg(dec!(110), OptionType::Call, dec!(0.80), dec!(0.90), 0.20),
                leg(dec!(120), OptionType::Call, dec!(0.10), dec!(0.15), 0.03),
            ],
        );
        let rec = recommender().recommend(&snap, &profile(0.5, Some(dec!(110)), Some(dec!(90))), classification());

        assert_eq!(rec.name, StrategyName::IronCondor);
        assert_eq!(rec.legs.len(), 4);
        assert_eq!(rec.short_strikes(), vec![dec!(90), dec!(110)]);
        // (0.90 - 0.25) + (0.80 - 0.15)
        assert_eq!(rec.estimated_credit, Some(dec!(1.30)));
        // 1 - 0.15 - 0.20
        assert_eq!(rec.probability_of_profit, Some(65.0));
        assert_eq!(rec.rationale, "Neutral GEX ($0.50B). Range: 90-110.");
    }

    #[test]
    fn test_iron_condor_default_offsets() {
        let snap = snapshot(dec!(4800), vec![]);
        let rec = recommender().recommend(&snap, &profile(0.0, None, None), classification());
        assert_eq!(rec.short_strikes(), vec![dec!(4775), dec!(4825)]);
        assert_eq!(rec.legs[1].strike, dec!(4765));
        assert_eq!(rec.legs[3].strike, dec!(4835));
    }

    #[test]
    fn test_condor_pop_clamped_at_zero() {
        let snap = snapshot(
            dec!(100),
            vec![
                leg(dec!(99), OptionType::Put, dec!(2), dec!(2.1), -0.60),
                leg(dec!(89), OptionType::Put, dec!(0.2), dec!(0.3), -0.10),
                leg(dec!(101), OptionType::Call, dec!(2), dec!(2.1), 0.55),
                leg(dec!(111), OptionType::Call, dec!(0.2), dec!(0.3), 0.10),
            ],
        );
        let rec = recommender().recommend(&snap, &profile(0.0, Some(dec!(101)), Some(dec!(99))), classification());
        assert_eq!(rec.probability_of_profit, Some(0.0));
    }
}
