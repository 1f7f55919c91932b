//! Commentary record and response parsing.

use serde::{Deserialize, Serialize};

/// Free-text commentary split into the sections the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commentary {
    pub pin_recommendation: String,
    pub trade_setup: String,
    /// Percent, 0 when not given.
    pub probability: u8,
    pub risk_reward: String,
    pub context: String,
    /// False for placeholders.
    pub available: bool,
}

impl Commentary {
    pub fn unavailable(pin: &str, trade_setup: &str, context: &str) -> Self {
        Self {
            pin_recommendation: pin.to_string(),
            trade_setup: trade_setup.to_string(),
            probability: 0,
            risk_reward: "N/A".to_string(),
            context: context.to_string(),
            available: false,
        }
    }
}

/// Parse line-prefixed sections:
///
/// ```text
/// PIN: <strikes and reasoning>
/// TRADE: <setup>
/// PROBABILITY: <n>%
/// R/R: <ratio>
/// CONTEXT: <explanation>
/// ```
///
/// Unknown lines are ignored; missing sections stay empty.
pub fn parse_commentary(text: &str) -> Commentary {
    let mut out = Commentary {
        pin_recommendation: String::new(),
        trade_setup: String::new(),
        probability: 0,
        risk_reward: String::new(),
        context: String::new(),
        available: true,
    };

    for line in text.lines().map(str::trim) {
        let line = line.trim_start_matches(['*', '-', ' ']);
        if let Some(rest) = line.strip_prefix("PIN:") {
            out.pin_recommendation = clean(rest);
        } else if let Some(rest) = line.strip_prefix("TRADE:") {
            out.trade_setup = clean(rest);
        } else if let Some(rest) = line.strip_prefix("PROBABILITY:") {
            out.probability = parse_probability(&clean(rest));
        } else if let Some(rest) = line.strip_prefix("R/R:").or_else(|| line.strip_prefix("R:R:")) {
            out.risk_reward = clean(rest);
        } else if let Some(rest) = line.strip_prefix("CONTEXT:") {
            out.context = clean(rest);
        }
    }

    out
}

/// Section value without surrounding whitespace or markdown emphasis.
fn clean(value: &str) -> String {
    value.trim().trim_matches('*').trim().to_string()
}

fn parse_probability(s: &str) -> u8 {
    s.replace('%', "")
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<f64>().ok())
        .map(|p| p.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0)
}
