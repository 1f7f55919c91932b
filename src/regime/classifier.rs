//! Gamma regime and entry signal classification.
//!
//! Both are pure functions of total exposure, the walls and spot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::gex::GexProfile;

/// Coarse dealer hedging regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GammaRegime {
    /// Dealers long gamma; hedging dampens moves.
    PositiveGamma,
    /// Dealers short gamma; hedging amplifies moves.
    NegativeGamma,
    Neutral,
}

impl GammaRegime {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PositiveGamma => "Positive Gamma",
            Self::NegativeGamma => "Negative Gamma",
            Self::Neutral => "Neutral",
        }
    }

    /// Expected price behavior.
    pub fn note(&self) -> &'static str {
        match self {
            Self::PositiveGamma => "mean-reversion",
            Self::NegativeGamma => "trending",
            Self::Neutral => "choppy",
        }
    }
}

/// Actionable entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Range,
    CautionNearResistance,
    CautionNearSupport,
    Wait,
}

impl Signal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "BUY (support bounce)",
            Self::Sell => "SELL (resistance rejection)",
            Self::Range => "RANGE (neutral)",
            Self::CautionNearResistance => "CAUTION (near resistance)",
            Self::CautionNearSupport => "CAUTION (near support)",
            Self::Wait => "WAIT",
        }
    }
}

/// Classifier thresholds. Exposure thresholds are in billions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Wall distance, in price units, that counts as "near".
    pub distance_threshold: f64,
    /// |total GEX| above which buy/sell signals can fire.
    pub directional_gex: f64,
    /// |total GEX| above which caution signals can fire.
    pub caution_gex: f64,
    /// |total GEX| above which the regime is no longer neutral.
    pub regime_gex: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 15.0,
            directional_gex: 1.0,
            caution_gex: 3.0,
            regime_gex: 2.0,
        }
    }
}

/// Regime and signal for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub regime: GammaRegime,
    pub signal: Signal,
}

/// Signal classifier.
pub struct SignalClassifier {
    config: SignalConfig,
}

impl SignalClassifier {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Classify a profile against spot.
    pub fn classify_profile(&self, profile: &GexProfile, price: Decimal) -> Classification {
        self.classify(profile.total_gex, profile.call_wall, profile.put_wall, price)
    }

    pub fn classify(
        &self,
        total_gex: f64,
        call_wall: Option<Decimal>,
        put_wall: Option<Decimal>,
        price: Decimal,
    ) -> Classification {
        Classification {
            regime: self.regime(total_gex),
            signal: self.signal(total_gex, call_wall, put_wall, price),
        }
    }

    pub fn regime(&self, total_gex: f64) -> GammaRegime {
        if total_gex > self.config.regime_gex {
            GammaRegime::PositiveGamma
        } else if total_gex < -self.config.regime_gex {
            GammaRegime::NegativeGamma
        } else {
            GammaRegime::Neutral
        }
    }

    /// First matching rule wins. A missing wall is infinitely far away.
    pub fn signal(
        &self,
        total_gex: f64,
        call_wall: Option<Decimal>,
        put_wall: Option<Decimal>,
        price: Decimal,
    ) -> Signal {
        let spot: f64 = price.try_into().unwrap_or(0.0);
        let to_call = call_wall.map_or(f64::INFINITY, |w| to_f64(w) - spot);
        let to_put = put_wall.map_or(f64::INFINITY, |w| spot - to_f64(w));

        let threshold = self.config.distance_threshold;
        let directional = self.config.directional_gex;
        let caution = self.config.caution_gex;

        if total_gex > directional && to_put < threshold {
            Signal::Buy
        } else if total_gex < -directional && to_call < threshold {
            Signal::Sell
        } else if total_gex.abs() <= directional && to_call > threshold && to_put > threshold {
            Signal::Range
        } else if total_gex > caution && to_call < threshold {
            Signal::CautionNearResistance
        } else if total_gex < -caution && to_put < threshold {
            Signal::CautionNearSupport
        } else {
            Signal::Wait
        }
    }
}

fn to_f64(d: Decimal) -> f64 {
    d.try_into().unwrap_or(0.0)
}
