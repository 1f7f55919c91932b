//! Dealer gamma-exposure (GEX) profiles from options chain snapshots.
//!
//! A snapshot flows through filtering and per-strike aggregation into a
//! band-limited profile (walls, flip strike, cumulative curve), then into a
//! regime/signal classification and a credit-spread recommendation. The
//! refresh coordinator repeats that pass against a live source and publishes
//! the latest report.

pub mod analytics;
pub mod annotation;
pub mod config;
pub mod data;
pub mod gex;
pub mod pipeline;
pub mod refresh;
pub mod regime;

// Re-export commonly used types
pub use analytics::{ChainStats, StrategyConfig, StrategyName, StrategyRecommendation, StrategyRecommender};
pub use annotation::{Annotator, Commentary, GenerativeAnnotator};
pub use config::{AppConfig, ConfigError};
pub use data::{ChainRequest, ChainSnapshot, ChainSource, ExpirationPreference, OptionContract, OptionType, SourceError};
pub use gex::{GexProfile, ProfileBuilder, ProfileConfig, ProfileError, StrikeBook};
pub use pipeline::{AnalyticsConfig, GexAnalyzer, GexReport, ProfileOutcome};
pub use refresh::{CycleOutcome, PublishedReport, RefreshConfig, RefreshCoordinator};
pub use regime::{Classification, GammaRegime, Signal, SignalClassifier};
