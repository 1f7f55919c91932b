//! Tradier API client for live chain snapshots.
//!
//! Endpoints used:
//! - `markets/quotes` for the underlying and volatility-index last price
//! - `markets/options/expirations` for the listed expiration dates
//! - `markets/options/chains` (with greeks) for the contracts

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::expiration::{select_expiration, ExpirationConfig};
use super::source::{ChainRequest, ChainSource, SourceError};
use super::types::{ChainSnapshot, OptionContract};
use super::wire::{RawGreeks, RawOption};

/// Tradier API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.tradier.com/v1";

/// Volatility index symbol quoted alongside every snapshot.
const VIX_SYMBOL: &str = "VIX";

/// Tradier client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradierConfig {
    pub base_url: String,
    /// Minimum spacing between requests, in milliseconds.
    pub min_request_interval_ms: u64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Whether to also quote the volatility index.
    pub fetch_vix: bool,
}

impl Default for TradierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            min_request_interval_ms: 100,
            request_timeout_secs: 10,
            fetch_vix: true,
        }
    }
}

/// Tradier returns a bare object instead of a one-element array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(t) => vec![t],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct QuotesResponse {
    quotes: Option<QuotesBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct QuotesBody {
    quote: Option<OneOrMany<RawQuote>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawQuote {
    symbol: String,
    last: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExpirationsResponse {
    expirations: Option<ExpirationsBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExpirationsBody {
    date: Option<OneOrMany<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChainResponse {
    options: Option<ChainBody>,
}

/// Chain record. Same fields as `RawOption` under Tradier's names; its
/// own `type` field is always "option" and is ignored.
#[derive(Debug, Clone, Deserialize)]
struct TradierOption {
    strike: f64,
    option_type: String,
    #[serde(default)]
    open_interest: Option<i64>,
    #[serde(default)]
    volume: Option<i64>,
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
    #[serde(default)]
    greeks: Option<RawGreeks>,
}

impl From<TradierOption> for RawOption {
    fn from(o: TradierOption) -> Self {
        Self {
            strike: o.strike,
            option_type: o.option_type,
            open_interest: o.open_interest,
            volume: o.volume,
            bid: o.bid,
            ask: o.ask,
            greeks: o.greeks,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChainBody {
    option: Option<OneOrMany<TradierOption>>,
}

/// Tradier API client.
pub struct TradierClient {
    client: Client,
    token: String,
    config: TradierConfig,
    expirations: ExpirationConfig,
    last_request: Mutex<Instant>,
}

impl TradierClient {
    /// Create a new Tradier client.
    pub fn new(token: String, config: TradierConfig, expirations: ExpirationConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let interval = Duration::from_millis(config.min_request_interval_ms);

        Ok(Self {
            client,
            token,
            config,
            expirations,
            last_request: Mutex::new(Instant::now().checked_sub(interval).unwrap_or_else(Instant::now)),
        })
    }

    /// Rate-limited GET helper.
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        {
            let mut last = self.last_request.lock().await;
            let interval = Duration::from_millis(self.config.min_request_interval_ms);
            let elapsed = last.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
            *last = Instant::now();
        }

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Last trade price for a symbol.
    pub async fn last_price(&self, symbol: &str) -> Result<Decimal, SourceError> {
        let response: QuotesResponse = self.request("markets/quotes", &[("symbols", symbol)]).await?;
        let quote = response
            .quotes
            .and_then(|q| q.quote)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| SourceError::NoData {
                ticker: symbol.to_string(),
                detail: "no quote returned".to_string(),
            })?;

        quote
            .last
            .and_then(|p| Decimal::try_from(p).ok())
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| SourceError::NoData {
                ticker: symbol.to_string(),
                detail: "quote has no last price".to_string(),
            })
    }

    /// Listed expiration dates, ascending.
    pub async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>, SourceError> {
        let response: ExpirationsResponse = self
            .request(
                "markets/options/expirations",
                &[("symbol", ticker), ("includeAllRoots", "true")],
            )
            .await?;

        let mut dates: Vec<NaiveDate> = response
            .expirations
            .and_then(|e| e.date)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .iter()
            .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .collect();
        dates.sort();
        Ok(dates)
    }

    /// Contracts for one expiration, greeks included.
    pub async fn chain(&self, ticker: &str, expiration: NaiveDate) -> Result<Vec<OptionContract>, SourceError> {
        let date_str = expiration.format("%Y-%m-%d").to_string();
        let response: ChainResponse = self
            .request(
                "markets/options/chains",
                &[("symbol", ticker), ("expiration", &date_str), ("greeks", "true")],
            )
            .await?;

        let raw = response
            .options
            .and_then(|o| o.option)
            .map(OneOrMany::into_vec)
            .unwrap_or_default();

        if raw.is_empty() {
            return Err(SourceError::NoData {
                ticker: ticker.to_string(),
                detail: format!("empty chain for {}", date_str),
            });
        }

        Ok(raw
            .into_iter()
            .map(RawOption::from)
            .filter_map(|o| o.to_contract())
            .collect())
    }
}

#[async_trait]
impl ChainSource for TradierClient {
    async fn fetch(&self, request: &ChainRequest) -> Result<ChainSnapshot, SourceError> {
        let ticker = request.ticker.as_str();
        let price = self.last_price(ticker).await?;

        let vix = if self.config.fetch_vix {
            match self.last_price(VIX_SYMBOL).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("VIX quote unavailable (non-critical): {}", e);
                    None
                }
            }
        } else {
            None
        };

        let listed = self.expirations(ticker).await?;
        let today = Local::now().date_naive();
        let expiration = select_expiration(&listed, today, request.expiration, &self.expirations).ok_or_else(|| {
            SourceError::NoExpiration {
                ticker: ticker.to_string(),
                preference: request.expiration.to_string(),
            }
        })?;
        debug!(%ticker, %expiration, preference = %request.expiration, "Resolved expiration");

        let contracts = self.chain(ticker, expiration).await?;
        info!(%ticker, %expiration, %price, contracts = contracts.len(), "Fetched chain");

        let mut snapshot = ChainSnapshot::new(ticker, expiration, price).with_contracts(contracts);
        snapshot.vix = vix;
        Ok(snapshot)
    }
}
