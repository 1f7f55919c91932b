//! Generative-language API annotator.
//!
//! Posts a `generateContent` request built from the report and parses the
//! reply with `parse_commentary`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::commentary::{parse_commentary, Commentary};
use super::{AnnotationError, Annotator};
use crate::pipeline::GexReport;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Annotator settings. The API key comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Upper bound on one annotation, in seconds.
    pub timeout_secs: u64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.4,
            max_output_tokens: 500,
            timeout_secs: 15,
        }
    }
}

impl AnnotationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }
}

/// HTTP annotator.
pub struct GenerativeAnnotator {
    client: Client,
    api_key: Option<String>,
    config: AnnotationConfig,
}

impl GenerativeAnnotator {
    pub fn new(api_key: Option<String>, config: AnnotationConfig) -> Result<Self, AnnotationError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            config,
        })
    }
}

#[async_trait]
impl Annotator for GenerativeAnnotator {
    async fn annotate(&self, report: &GexReport) -> Result<Commentary, AnnotationError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnnotationError::Disabled("GEMINI_API_KEY not set".to_string()))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": build_prompt(report) }] }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&payload)
            .send()
            .await?;
        debug!(status = %response.status(), "Commentary response");

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnnotationError::QuotaExceeded);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AnnotationError::ApiError(format!("{}: {}", status, text)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnnotationError::InvalidResponse(e.to_string()))?;
        let text = body
            .first_text()
            .ok_or_else(|| AnnotationError::InvalidResponse("no candidate text".to_string()))?;

        Ok(parse_commentary(&text))
    }
}

/// Prompt for one report.
pub fn build_prompt(report: &GexReport) -> String {
    let opt = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |x| format!("{}", x));
    let rec = &report.recommendation;

    format!(
        "You are an expert options trader analyzing Gamma Exposure (GEX) data.\n\n\
         CURRENT MARKET DATA:\n\
         - Ticker: {ticker}\n\
         - Current Price: ${price:.2}\n\
         - Expiration: {expiry}\n\
         - Total GEX: ${total_gex:.2}B\n\
         - Call Wall: {call_wall}\n\
         - Put Wall: {put_wall}\n\
         - Flip Strike: {flip}\n\
         - Put/Call Ratio: {pcr}\n\
         - IV (ATM): {iv}%\n\
         - Expected Move: ±${em}\n\
         - Current Signal: {signal}\n\
         - Volatility Regime: {regime}\n\
         - VIX: {vix}\n\
         - Rule-based Setup: {setup}\n\n\
         TASK:\n\
         1. PIN RECOMMENDATION: which strike(s) anchor the short leg, and why.\n\
         2. TRADE SETUP: a specific trade (e.g. \"Bull Put Spread: Sell 6820P / Buy 6810P\").\n\
         3. PROBABILITY: estimated probability of profit (0-100%).\n\
         4. RISK/REWARD: estimated R/R ratio.\n\
         5. MARKET CONTEXT: why this trade makes sense now.\n\n\
         Be specific with strike prices. Keep each section to 1-2 sentences. Format as:\n\
         PIN: <strikes and reasoning>\n\
         TRADE: <specific setup>\n\
         PROBABILITY: <number>%\n\
         R/R: <ratio like 1:3>\n\
         CONTEXT: <brief explanation>",
        ticker = report.ticker,
        price = report.price,
        expiry = report.expiry,
        total_gex = report.total_gex,
        call_wall = opt(report.call_wall),
        put_wall = opt(report.put_wall),
        flip = report.flip_strike,
        pcr = opt(report.put_call_ratio),
        iv = opt(report.atm_iv),
        em = opt(report.expected_move),
        signal = report.signal,
        regime = report.regime,
        vix = opt(report.vix),
        setup = rec.legs_summary(),
    )
}
