//! Chain source port.
//!
//! Anything that can produce a `ChainSnapshot` for a ticker and an
//! expiration choice. Retrieval, auth and retries belong to the
//! implementation; the analytics never see them.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::expiration::ExpirationPreference;
use super::types::ChainSnapshot;

/// Chain source errors. Any of these means the cycle is skipped.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("No data available for {ticker}: {detail}")]
    NoData { ticker: String, detail: String },

    #[error("No listed expiration matches {preference} for {ticker}")]
    NoExpiration { ticker: String, preference: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to fetch: a ticker and how to pick its expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRequest {
    pub ticker: String,
    pub expiration: ExpirationPreference,
}

impl ChainRequest {
    pub fn new(ticker: impl Into<String>, expiration: ExpirationPreference) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            expiration,
        }
    }

    /// Request a specific expiration date.
    pub fn for_date(ticker: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(ticker, ExpirationPreference::Exact(date))
    }
}

/// Supplies chain snapshots.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch(&self, request: &ChainRequest) -> Result<ChainSnapshot, SourceError>;
}
