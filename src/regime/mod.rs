//! Gamma regime and entry signal classification.
//!
//! Classifies total exposure into a hedging regime:
//! - Positive Gamma: total GEX > 2, mean-reversion
//! - Negative Gamma: total GEX < -2, trending
//! - Neutral: otherwise, choppy
//!
//! and maps exposure plus wall distances to a single entry signal.

pub mod classifier;

pub use classifier::{Classification, GammaRegime, Signal, SignalClassifier, SignalConfig};
