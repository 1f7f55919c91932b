//! JSON snapshot in, report out.

use std::io::Write;

use serde_json::{json, Value};
use tempfile::NamedTempFile;

use gex_profile::data::{ChainRequest, ChainSource, ExpirationPreference, JsonFileSource, SourceError};
use gex_profile::pipeline::{AnalyticsConfig, GexAnalyzer, ProfileOutcome};

fn write_snapshot(record: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", record).unwrap();
    file
}

fn option(strike: f64, kind: &str, gamma: Option<f64>, oi: i64, delta: f64) -> Value {
    let mut o = json!({
        "strike": strike,
        "type": kind,
        "openInterest": oi,
        "volume": oi / 10,
        "bid": 1.0,
        "ask": 1.1,
    });
    if let Some(g) = gamma {
        o["greeks"] = json!({ "gamma": g, "delta": delta, "mid_iv": 0.15 });
    }
    o
}

/// SPY-like chain: call OI concentrated above spot, put OI below.
fn spy_chain() -> Value {
    let spot = 470.0;
    let mut options = Vec::new();
    for i in -12..=12 {
        let strike = spot + 5.0 * i as f64;
        let gamma = 0.05 * (-(i as f64 / 4.0).powi(2)).exp();
        let call_oi = if i >= 0 { 4000 + 300 * i as i64 } else { 500 };
        let put_oi = if i <= 0 { 4000 - 300 * i as i64 } else { 500 };
        options.push(option(strike, "call", Some(gamma), call_oi, 0.5 - 0.04 * i as f64));
        options.push(option(strike, "put", Some(gamma), put_oi, -0.5 - 0.04 * i as f64));
    }
    json!({
        "ticker": "SPY",
        "expiration": "2024-01-19",
        "underlyingPrice": spot,
        "options": options,
    })
}

async fn run(record: &Value, ticker: &str) -> ProfileOutcome {
    let file = write_snapshot(record);
    let source = JsonFileSource::new(file.path());
    let snapshot = source
        .fetch(&ChainRequest::new(ticker, ExpirationPreference::ZeroDte))
        .await
        .unwrap();
    GexAnalyzer::new(&AnalyticsConfig::default()).outcome(&snapshot).unwrap()
}

#[tokio::test]
async fn spy_chain_produces_consistent_report() {
    let outcome = run(&spy_chain(), "spy").await;
    let report = outcome.report().unwrap();

    assert_eq!(report.ticker, "SPY");
    assert_eq!(report.expiry, "2024-01-19");

    let n = report.strikes.len();
    assert!(n > 0);
    assert_eq!(report.gex.len(), n);
    assert_eq!(report.oi.len(), n);
    assert_eq!(report.volume.len(), n);
    assert_eq!(report.cumulative.len(), n);
    assert!(report.strikes.windows(2).all(|w| w[0] < w[1]));
    assert!(report.strikes.iter().all(|k| (k - 470.0).abs() / 470.0 <= 0.10));

    // Flip strike sits in the band at the smallest |cumulative|
    let idx = report.strikes.iter().position(|k| *k == report.flip_strike).unwrap();
    let min_abs = report.cumulative.iter().map(|c| c.abs()).fold(f64::INFINITY, f64::min);
    assert_eq!(report.cumulative[idx].abs(), min_abs);

    let call_wall = report.call_wall.unwrap();
    let put_wall = report.put_wall.unwrap();
    assert!(call_wall > 470.0);
    assert!(put_wall < 470.0);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "ready");
    assert!(json["recommendation"]["legs"].as_array().is_some_and(|legs| !legs.is_empty()));
}

#[tokio::test]
async fn support_bounce_recommends_bull_put() {
    let record = json!({
        "ticker": "TEST",
        "expiration": "2024-01-19",
        "underlyingPrice": 100,
        "options": [
            option(100.0, "call", Some(0.5), 20_000, 0.5),
            option(90.0, "put", Some(0.05), 1_000, -0.3),
            option(80.0, "put", Some(0.01), 100, -0.05),
        ],
    });
    let outcome = run(&record, "TEST").await;
    let report = outcome.report().unwrap();

    assert_eq!(report.signal, "BUY (support bounce)");
    assert_eq!(report.regime, "Positive Gamma");
    assert_eq!(report.put_wall, Some(90.0));
    assert_eq!(report.recommendation.name, "Bull Put Spread");
    assert_eq!(report.recommendation.legs_summary(), "SELL 90 PUT / BUY 80 PUT");
    assert_eq!(report.recommendation.probability_of_profit, Some(70.0));
}

#[tokio::test]
async fn chain_without_greeks_is_insufficient_data() {
    let record = json!({
        "ticker": "SPY",
        "expiration": "2024-01-19",
        "underlyingPrice": 470,
        "options": [ option(470.0, "call", None, 1000, 0.5), option(470.0, "put", None, 1000, -0.5) ],
    });
    let outcome = run(&record, "SPY").await;
    assert!(outcome.report().is_none());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "insufficient_data");
    assert_eq!(json["ticker"], "SPY");
}

#[tokio::test]
async fn ticker_mismatch_is_no_data() {
    let file = write_snapshot(&spy_chain());
    let source = JsonFileSource::new(file.path());
    let err = source
        .fetch(&ChainRequest::new("QQQ", ExpirationPreference::ZeroDte))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::NoData { .. }));
}
