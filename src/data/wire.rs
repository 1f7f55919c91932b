//! JSON input contract for chain snapshots.
//!
//! One record per fetch:
//!
//! ```json
//! { "ticker": "SPX", "expiration": "2024-01-19", "underlyingPrice": 4780.5,
//!   "options": [ { "strike": 4780, "type": "call", "openInterest": 1200,
//!                  "volume": 300, "bid": 10.1, "ask": 10.4,
//!                  "greeks": { "gamma": 0.004, "delta": 0.51, "mid_iv": 0.12 } } ] }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::source::{ChainRequest, ChainSource, SourceError};
use super::types::{ChainSnapshot, OptionContract, OptionType};

/// Greeks block as supplied by the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGreeks {
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub mid_iv: Option<f64>,
}

/// Raw option record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOption {
    pub strike: f64,
    #[serde(rename = "type")]
    pub option_type: String,
    #[serde(default)]
    pub open_interest: Option<i64>,
    #[serde(default)]
    pub volume: Option<i64>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub greeks: Option<RawGreeks>,
}

impl RawOption {
    /// Convert to an `OptionContract`. Records with an unknown type or a
    /// non-finite strike are dropped.
    pub fn to_contract(&self) -> Option<OptionContract> {
        let option_type = OptionType::from_str(&self.option_type)?;
        let greeks = self.greeks.clone().unwrap_or_default();

        Some(OptionContract {
            strike: Decimal::try_from(self.strike).ok()?,
            option_type,
            gamma: greeks.gamma,
            open_interest: self.open_interest.unwrap_or(0).max(0),
            volume: self.volume.unwrap_or(0).max(0),
            bid: Decimal::try_from(self.bid.unwrap_or(0.0)).unwrap_or_default(),
            ask: Decimal::try_from(self.ask.unwrap_or(0.0)).unwrap_or_default(),
            delta: greeks.delta.unwrap_or(0.0),
            implied_vol: greeks.mid_iv.unwrap_or(0.0),
        })
    }
}

/// Raw chain record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChainRecord {
    pub ticker: String,
    pub expiration: String,
    pub underlying_price: f64,
    #[serde(default)]
    pub vix: Option<f64>,
    #[serde(default)]
    pub options: Vec<RawOption>,
}

impl RawChainRecord {
    /// Convert to a `ChainSnapshot`, validating the header fields.
    pub fn into_snapshot(self) -> Result<ChainSnapshot, SourceError> {
        let expiration = NaiveDate::parse_from_str(&self.expiration, "%Y-%m-%d")
            .map_err(|e| SourceError::InvalidResponse(format!("bad expiration {}: {}", self.expiration, e)))?;

        let underlying_price = Decimal::try_from(self.underlying_price)
            .ok()
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| {
                SourceError::InvalidResponse(format!("bad underlying price {}", self.underlying_price))
            })?;

        let total = self.options.len();
        let contracts: Vec<OptionContract> = self.options.iter().filter_map(RawOption::to_contract).collect();
        if contracts.len() < total {
            debug!(dropped = total - contracts.len(), "Dropped malformed option records");
        }

        let mut snapshot = ChainSnapshot::new(self.ticker, expiration, underlying_price).with_contracts(contracts);
        snapshot.vix = self.vix.and_then(|v| Decimal::try_from(v).ok());
        Ok(snapshot)
    }
}

/// Parse a snapshot from JSON text.
pub fn parse_snapshot(json: &str) -> Result<ChainSnapshot, SourceError> {
    let record: RawChainRecord = serde_json::from_str(json)?;
    record.into_snapshot()
}

/// Chain source that replays a JSON snapshot file.
///
/// The request's ticker must match the file's ticker; the expiration
/// preference is ignored since the file holds one expiration.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ChainSource for JsonFileSource {
    async fn fetch(&self, request: &ChainRequest) -> Result<ChainSnapshot, SourceError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let snapshot = parse_snapshot(&text)?;
        if !snapshot.ticker.eq_ignore_ascii_case(&request.ticker) {
            return Err(SourceError::NoData {
                ticker: request.ticker.clone(),
                detail: format!("{} holds {}", self.path.display(), snapshot.ticker),
            });
        }
        Ok(snapshot)
    }
}
