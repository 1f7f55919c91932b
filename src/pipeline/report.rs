//! Output record for presentation consumers.
//!
//! `strikes`, `gex`, `oi`, `volume` and `cumulative` are parallel,
//! band-limited and ascending by strike.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::GexAnalysis;
use crate::analytics::{SpreadLeg, StrategyRecommendation};
use crate::annotation::Commentary;
use crate::data::ChainSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLeg {
    pub action: String,
    pub strike: f64,
    #[serde(rename = "type")]
    pub option_type: String,
}

impl From<&SpreadLeg> for ReportLeg {
    fn from(leg: &SpreadLeg) -> Self {
        Self {
            action: leg.action.as_str().to_string(),
            strike: to_f64(leg.strike),
            option_type: leg.option_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecommendation {
    pub name: String,
    pub legs: Vec<ReportLeg>,
    pub rationale: String,
    pub estimated_credit: Option<f64>,
    pub probability_of_profit: Option<f64>,
}

impl ReportRecommendation {
    /// e.g. "SELL 4800 PUT / BUY 4790 PUT"
    pub fn legs_summary(&self) -> String {
        self.legs
            .iter()
            .map(|l| format!("{} {} {}", l.action.to_uppercase(), l.strike, l.option_type.to_uppercase()))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl From<&StrategyRecommendation> for ReportRecommendation {
    fn from(rec: &StrategyRecommendation) -> Self {
        Self {
            name: rec.name.label().to_string(),
            legs: rec.legs.iter().map(ReportLeg::from).collect(),
            rationale: rec.rationale.clone(),
            estimated_credit: rec.estimated_credit.map(to_f64),
            probability_of_profit: rec.probability_of_profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GexReport {
    pub ticker: String,
    pub price: f64,
    pub expiry: String,
    pub total_gex: f64,
    pub call_wall: Option<f64>,
    pub put_wall: Option<f64>,
    pub max_oi_strike: Option<f64>,
    pub strikes: Vec<f64>,
    pub gex: Vec<f64>,
    pub oi: Vec<i64>,
    pub volume: Vec<i64>,
    pub cumulative: Vec<f64>,
    pub flip_strike: f64,
    pub regime: String,
    pub regime_note: String,
    pub signal: String,
    pub recommendation: ReportRecommendation,
    pub vix: Option<f64>,
    pub put_call_ratio: Option<f64>,
    pub atm_iv: Option<f64>,
    pub expected_move: Option<f64>,
    pub commentary: Option<Commentary>,
}

impl GexReport {
    pub fn new(snapshot: &ChainSnapshot, analysis: &GexAnalysis) -> Self {
        let profile = &analysis.profile;

        Self {
            ticker: snapshot.ticker.clone(),
            price: to_f64(snapshot.underlying_price),
            expiry: snapshot.expiration.format("%Y-%m-%d").to_string(),
            total_gex: profile.total_gex,
            call_wall: profile.call_wall.map(to_f64),
            put_wall: profile.put_wall.map(to_f64),
            max_oi_strike: profile.max_oi_strike.map(to_f64),
            strikes: profile.strikes.iter().map(|a| to_f64(a.strike)).collect(),
            gex: profile.net_gex_values(),
            oi: profile.strikes.iter().map(|a| a.total_open_interest).collect(),
            volume: profile.strikes.iter().map(|a| a.total_volume).collect(),
            cumulative: profile.cumulative.clone(),
            flip_strike: to_f64(profile.flip_strike),
            regime: analysis.classification.regime.label().to_string(),
            regime_note: analysis.classification.regime.note().to_string(),
            signal: analysis.classification.signal.label().to_string(),
            recommendation: ReportRecommendation::from(&analysis.recommendation),
            vix: snapshot.vix.map(to_f64),
            put_call_ratio: analysis.stats.put_call_ratio,
            atm_iv: analysis.stats.atm_iv_pct,
            expected_move: analysis.stats.expected_move.map(to_f64),
            commentary: None,
        }
    }

    pub fn with_commentary(mut self, commentary: Commentary) -> Self {
        self.commentary = Some(commentary);
        self
    }
}

fn to_f64(d: Decimal) -> f64 {
    d.try_into().unwrap_or(0.0)
}
