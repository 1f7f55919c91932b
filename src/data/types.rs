//! Core data types for options chain snapshots.
//!
//! A `ChainSnapshot` is one fetch of a single expiration: the underlying's
//! last price plus every listed contract with its supplied greeks. It is
//! immutable for the duration of a compute pass.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }

    /// Dealer-exposure sign: calls add gamma, puts subtract it.
    pub fn exposure_sign(&self) -> f64 {
        match self {
            Self::Call => 1.0,
            Self::Put => -1.0,
        }
    }
}

/// A single listed option contract as supplied by the chain source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Strike price
    pub strike: Decimal,

    /// Option type (call or put)
    pub option_type: OptionType,

    /// Gamma, absent when the source did not quote greeks
    pub gamma: Option<f64>,

    /// Open interest
    pub open_interest: i64,

    /// Session volume
    pub volume: i64,

    /// Bid price
    pub bid: Decimal,

    /// Ask price
    pub ask: Decimal,

    /// Delta (negative for puts)
    pub delta: f64,

    /// Mid implied volatility, as a fraction
    pub implied_vol: f64,
}

impl OptionContract {
    /// Mid price.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Whether this contract carries usable gamma and open interest.
    pub fn is_gex_eligible(&self) -> bool {
        matches!(self.gamma, Some(g) if g != 0.0 && g.is_finite()) && self.open_interest > 0
    }
}

/// One fetch of an options chain for a single expiration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    /// Underlying symbol (e.g., "SPX")
    pub ticker: String,

    /// Expiration date of every contract in the snapshot
    pub expiration: NaiveDate,

    /// Underlying last price
    pub underlying_price: Decimal,

    /// Volatility index quote at fetch time, when available
    pub vix: Option<Decimal>,

    /// Contracts in source order
    pub contracts: Vec<OptionContract>,
}

impl ChainSnapshot {
    pub fn new(ticker: impl Into<String>, expiration: NaiveDate, underlying_price: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            expiration,
            underlying_price,
            vix: None,
            contracts: Vec::new(),
        }
    }

    pub fn with_contracts(mut self, contracts: Vec<OptionContract>) -> Self {
        self.contracts = contracts;
        self
    }

    /// Underlying price as `f64` for exposure arithmetic.
    pub fn spot(&self) -> f64 {
        self.underlying_price.try_into().unwrap_or(0.0)
    }

    /// Find the contract listed at `(strike, option_type)`.
    pub fn contract_at(&self, strike: Decimal, option_type: OptionType) -> Option<&OptionContract> {
        self.contracts
            .iter()
            .find(|c| c.strike == strike && c.option_type == option_type)
    }

    pub fn calls(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.option_type == OptionType::Call)
    }

    pub fn puts(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.option_type == OptionType::Put)
    }

    /// Get all strikes listed in this snapshot, ascending.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<_> = self.contracts.iter().map(|c| c.strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }
}
