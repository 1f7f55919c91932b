//! One compute pass: snapshot in, report out.
//!
//! Filter → aggregate → profile → classify → recommend. The pass is pure
//! and synchronous; it performs no I/O.

pub mod report;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use report::{GexReport, ReportLeg, ReportRecommendation};

use crate::analytics::{ChainStats, StrategyConfig, StrategyRecommendation, StrategyRecommender};
use crate::data::ChainSnapshot;
use crate::gex::{self, GexProfile, ProfileBuilder, ProfileConfig, ProfileError, StrikeBook};
use crate::regime::{Classification, SignalClassifier, SignalConfig};

/// Settings for every analytics stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub profile: ProfileConfig,
    pub signal: SignalConfig,
    pub strategy: StrategyConfig,
}

/// Everything derived from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct GexAnalysis {
    pub profile: GexProfile,
    pub classification: Classification,
    pub recommendation: StrategyRecommendation,
    pub stats: ChainStats,
}

/// Result of a pass as published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProfileOutcome {
    Ready(Box<GexReport>),
    /// Nothing analyzable near spot. Not the same as zero exposure.
    InsufficientData {
        ticker: String,
        expiry: String,
        message: String,
    },
}

impl ProfileOutcome {
    pub fn report(&self) -> Option<&GexReport> {
        match self {
            Self::Ready(report) => Some(report),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            Self::Ready(report) => &report.ticker,
            Self::InsufficientData { ticker, .. } => ticker,
        }
    }
}

/// Runs the analytics stages with one configuration.
pub struct GexAnalyzer {
    builder: ProfileBuilder,
    classifier: SignalClassifier,
    recommender: StrategyRecommender,
}

impl GexAnalyzer {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            builder: ProfileBuilder::new(config.profile.clone()),
            classifier: SignalClassifier::new(config.signal.clone()),
            recommender: StrategyRecommender::new(config.strategy.clone()),
        }
    }

    /// Analyze one snapshot.
    pub fn analyze(&self, snapshot: &ChainSnapshot) -> Result<GexAnalysis, ProfileError> {
        let book = StrikeBook::from_snapshot(snapshot);
        debug!(
            ticker = %snapshot.ticker,
            eligible = gex::eligible_contracts(snapshot).count(),
            ineligible = gex::ineligible_count(snapshot),
            strikes = book.len(),
            exposed = book.exposed().count(),
            "Aggregated chain"
        );

        let profile = self.builder.build_from_book(snapshot, &book)?;
        let classification = self.classifier.classify_profile(&profile, snapshot.underlying_price);
        let recommendation = self.recommender.recommend(snapshot, &profile, classification);
        let stats = ChainStats::compute(snapshot, self.recommender.config());

        Ok(GexAnalysis {
            profile,
            classification,
            recommendation,
            stats,
        })
    }

    /// Analyze and map to the output record. `NoData` becomes
    /// `InsufficientData`; any other profile error is returned.
    pub fn outcome(&self, snapshot: &ChainSnapshot) -> Result<ProfileOutcome, ProfileError> {
        match self.analyze(snapshot) {
            Ok(analysis) => Ok(ProfileOutcome::Ready(Box::new(GexReport::new(snapshot, &analysis)))),
            Err(e @ ProfileError::NoData { .. }) => Ok(ProfileOutcome::InsufficientData {
                ticker: snapshot.ticker.clone(),
                expiry: snapshot.expiration.format("%Y-%m-%d").to_string(),
                message: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::StrategyName;
    use crate::data::{OptionContract, OptionType};
    use crate::regime::Signal;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn contract(strike: Decimal, option_type: OptionType, gamma: Option<f64>, oi: i64) -> OptionContract {
        OptionContract {
            strike,
            option_type,
            gamma,
            open_interest: oi,
            volume: 5,
            bid: dec!(1.0),
            ask: dec!(1.1),
            delta: if option_type == OptionType::Call { 0.3 } else { -0.3 },
            implied_vol: 0.2,
        }
    }

    fn snapshot(contracts: Vec<OptionContract>) -> ChainSnapshot {
        ChainSnapshot::new("SPY", NaiveDate::from_ymd_opt(2024, 1, 19).unwrap(), dec!(100)).with_contracts(contracts)
    }

    #[test]
    fn test_offsetting_book_is_neutral_range() {
        let snap = snapshot(vec![
            contract(dec!(100), OptionType::Call, Some(0.05), 1000),
            contract(dec!(100), OptionType::Put, Some(0.05), 1000),
        ]);
        let analysis = GexAnalyzer::new(&AnalyticsConfig::default()).analyze(&snap).unwrap();

        assert!(analysis.profile.total_gex.abs() < 1e-12);
        assert_eq!(analysis.classification.regime, crate::regime::GammaRegime::Neutral);
        assert_eq!(analysis.classification.signal, Signal::Range);
        assert_eq!(analysis.recommendation.name, StrategyName::IronCondor);
    }

    #[test]
    fn test_strong_positive_book_buys_support() {
        // Put wall at 90, large call exposure at 100
        let snap = snapshot(vec![
            contract(dec!(100), OptionType::Call, Some(0.5), 20_000),
            contract(dec!(90), OptionType::Put, Some(0.05), 1000),
            contract(dec!(80), OptionType::Put, Some(0.01), 100),
        ]);
        let analysis = GexAnalyzer::new(&AnalyticsConfig::default()).analyze(&snap).unwrap();

        assert!(analysis.profile.total_gex > 3.0);
        assert_eq!(analysis.profile.put_wall, Some(dec!(90)));
        assert_eq!(analysis.classification.signal, Signal::Buy);
        assert_eq!(analysis.recommendation.name, StrategyName::BullPutSpread);
        assert_eq!(analysis.recommendation.short_strikes(), vec![dec!(90)]);
        assert_eq!(analysis.recommendation.legs[1].strike, dec!(80));
        // 1.0 bid - 1.1 ask
        assert_eq!(analysis.recommendation.estimated_credit, Some(dec!(-0.10)));
        assert_eq!(analysis.recommendation.probability_of_profit, Some(70.0));
    }

    #[test]
    fn test_no_data_outcome() {
        let snap = snapshot(vec![contract(dec!(100), OptionType::Call, None, 1000)]);
        let outcome = GexAnalyzer::new(&AnalyticsConfig::default()).outcome(&snap).unwrap();
        assert!(matches!(outcome, ProfileOutcome::InsufficientData { .. }));
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_idempotent_pass() {
        let snap = snapshot(vec![
            contract(dec!(95), OptionType::Put, Some(0.03), 800),
            contract(dec!(100), OptionType::Call, Some(0.04), 1200),
            contract(dec!(105), OptionType::Call, Some(0.02), 600),
        ]);
        let analyzer = GexAnalyzer::new(&AnalyticsConfig::default());
        assert_eq!(analyzer.analyze(&snap).unwrap(), analyzer.analyze(&snap).unwrap());
        assert_eq!(analyzer.outcome(&snap).unwrap(), analyzer.outcome(&snap).unwrap());
    }
}
