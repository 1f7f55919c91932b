//! Application configuration.
//!
//! Every section has working defaults; a TOML file only needs the keys it
//! overrides. Secrets never live in the file and are read from the
//! environment (a `.env` file is honored).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::AnnotationConfig;
use crate::data::{ExpirationConfig, TradierConfig};
use crate::pipeline::AnalyticsConfig;
use crate::refresh::RefreshConfig;

pub const TRADIER_API_KEY: &str = "TRADIER_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analytics: AnalyticsConfig,
    pub expiration: ExpirationConfig,
    pub refresh: RefreshConfig,
    pub tradier: TradierConfig,
    pub annotation: AnnotationConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_toml(&std::fs::read_to_string(p)?),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Load `.env` if present. Missing files are not an error.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Non-empty environment value.
pub fn env_secret(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn tradier_token() -> Result<String, ConfigError> {
    env_secret(TRADIER_API_KEY).ok_or(ConfigError::MissingEnv(TRADIER_API_KEY))
}

pub fn gemini_key() -> Option<String> {
    env_secret(GEMINI_API_KEY)
}
