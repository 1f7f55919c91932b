pub mod expiration;
pub mod source;
pub mod tradier;
pub mod types;
pub mod wire;

pub use expiration::{select_expiration, ExpirationConfig, ExpirationPreference};
pub use source::{ChainRequest, ChainSource, SourceError};
pub use tradier::{TradierClient, TradierConfig};
pub use types::{ChainSnapshot, OptionContract, OptionType};
pub use wire::{parse_snapshot, JsonFileSource, RawChainRecord};
