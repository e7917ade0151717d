//! Round service configuration.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`RoundServiceConfig::max_conflict_retries`].
pub const MAX_CONFLICT_RETRIES_VAR: &str = "CAREINS_MAX_CONFLICT_RETRIES";

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundServiceConfig {
    /// How many times a command is reloaded and reapplied after a version
    /// conflict before the service gives up.
    pub max_conflict_retries: u32,
}

impl Default for RoundServiceConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl RoundServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CAREINS_MAX_CONFLICT_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_conflict_retries = match lookup(MAX_CONFLICT_RETRIES_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: MAX_CONFLICT_RETRIES_VAR,
                value: raw,
            })?,
            None => DEFAULT_MAX_CONFLICT_RETRIES,
        };
        Ok(Self {
            max_conflict_retries,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}
