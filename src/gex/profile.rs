//! GEX profile construction.
//!
//! Walls, total exposure and max-OI are computed over the full strike book;
//! the cumulative curve and flip strike only over the display band.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::aggregator::{StrikeAggregate, StrikeBook};
use crate::data::ChainSnapshot;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// No strike with exposure lies inside the display band.
    #[error("Insufficient data for {ticker}: no exposed strikes within {band_pct:.1}% of {price}")]
    NoData {
        ticker: String,
        price: Decimal,
        band_pct: f64,
    },

    #[error("Invalid band percent: {0}")]
    InvalidBand(f64),
}

/// Profile builder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Display half-width as a fraction of spot.
    pub band_percent: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { band_percent: 0.10 }
    }
}

/// Dealer gamma-exposure profile for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexProfile {
    /// Band-limited, ascending.
    pub strikes: Vec<StrikeAggregate>,
    /// Running sum of `net_gex`, parallel to `strikes`.
    pub cumulative: Vec<f64>,
    /// Sum over the full book, independent of the band.
    pub total_gex: f64,
    /// Strike of the largest positive exposure.
    pub call_wall: Option<Decimal>,
    /// Strike of the most negative exposure.
    pub put_wall: Option<Decimal>,
    /// Band strike where |cumulative| is smallest.
    pub flip_strike: Decimal,
    /// Strike with the most combined open interest.
    pub max_oi_strike: Option<Decimal>,
}

impl GexProfile {
    pub fn strike_values(&self) -> Vec<Decimal> {
        self.strikes.iter().map(|a| a.strike).collect()
    }

    pub fn net_gex_values(&self) -> Vec<f64> {
        self.strikes.iter().map(|a| a.net_gex).collect()
    }

    /// Cumulative exposure at a band strike.
    pub fn cumulative_at(&self, strike: Decimal) -> Option<f64> {
        self.strikes
            .iter()
            .position(|a| a.strike == strike)
            .map(|i| self.cumulative[i])
    }
}

/// Builds profiles from snapshots.
pub struct ProfileBuilder {
    config: ProfileConfig,
}

impl ProfileBuilder {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    /// Build a profile from a snapshot.
    pub fn build(&self, snapshot: &ChainSnapshot) -> Result<GexProfile, ProfileError> {
        let book = StrikeBook::from_snapshot(snapshot);
        self.build_from_book(snapshot, &book)
    }

    /// Build a profile from an already aggregated book.
    pub fn build_from_book(&self, snapshot: &ChainSnapshot, book: &StrikeBook) -> Result<GexProfile, ProfileError> {
        let band = self.config.band_percent;
        let band_fraction = Decimal::try_from(band)
            .ok()
            .filter(|b| !b.is_sign_negative())
            .ok_or(ProfileError::InvalidBand(band))?;

        let price = snapshot.underlying_price;
        let total_gex = book.total_gex();
        let (call_wall, put_wall) = walls(book);
        let max_oi_strike = max_oi_strike(book);

        // BTreeMap order keeps the band ascending
        let strikes: Vec<StrikeAggregate> = book
            .exposed()
            .filter(|a| within_band(a.strike, price, band_fraction))
            .cloned()
            .collect();

        if strikes.is_empty() {
            return Err(ProfileError::NoData {
                ticker: snapshot.ticker.clone(),
                price: snapshot.underlying_price,
                band_pct: band * 100.0,
            });
        }

        let cumulative: Vec<f64> = strikes
            .iter()
            .scan(0.0, |acc, a| {
                *acc += a.net_gex;
                Some(*acc)
            })
            .collect();

        let mut flip_idx = 0;
        for (i, c) in cumulative.iter().enumerate() {
            if c.abs() < cumulative[flip_idx].abs() {
                flip_idx = i;
            }
        }

        Ok(GexProfile {
            flip_strike: strikes[flip_idx].strike,
            strikes,
            cumulative,
            total_gex,
            call_wall,
            put_wall,
            max_oi_strike,
        })
    }
}

/// Inclusive at the edge. Exact in `Decimal`, so `price × band` away still counts.
fn within_band(strike: Decimal, price: Decimal, band: Decimal) -> bool {
    if price <= Decimal::ZERO {
        return false;
    }
    (strike - price).abs() <= price * band
}

/// Largest positive and most negative exposure. Ties keep the lower strike.
fn walls(book: &StrikeBook) -> (Option<Decimal>, Option<Decimal>) {
    let mut call: Option<&StrikeAggregate> = None;
    let mut put: Option<&StrikeAggregate> = None;

    for agg in book.exposed() {
        if agg.net_gex > 0.0 && call.map_or(true, |c| agg.net_gex > c.net_gex) {
            call = Some(agg);
        }
        if agg.net_gex < 0.0 && put.map_or(true, |p| agg.net_gex < p.net_gex) {
            put = Some(agg);
        }
    }

    (call.map(|a| a.strike), put.map(|a| a.strike))
}

fn max_oi_strike(book: &StrikeBook) -> Option<Decimal> {
    let mut best: Option<&StrikeAggregate> = None;
    for agg in book.iter() {
        if best.map_or(true, |b| agg.total_open_interest > b.total_open_interest) {
            best = Some(agg);
        }
    }
    best.map(|a| a.strike)
}
