//! Options analytics module.
//!
//! Provides:
//! - Credit spread selection from a GEX profile
//! - Chain-wide statistics (put/call ratio, ATM IV, expected move)

pub mod chain_stats;
pub mod strategy;

pub use chain_stats::ChainStats;
pub use strategy::{
    LegAction, SpreadLeg, StrategyConfig, StrategyName, StrategyRecommendation, StrategyRecommender,
};
