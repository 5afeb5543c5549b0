//! Synthesis configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_SETTLE_DELAY_SECS: f64 = 2.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for [`AutoRoutineMaker`](crate::AutoRoutineMaker).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Settle/placement pause after every path segment, in seconds. Default: 2.5.
    pub settle_delay_secs: f64,
    /// Number of scoring groups offered to the operator. Default: 6.
    pub group_count: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: DEFAULT_SETTLE_DELAY_SECS,
            group_count: 6,
        }
    }
}

impl SynthesisConfig {
    /// The settle delay. An unrepresentable value (negative, NaN, too large)
    /// falls back to the default of 2.5 s.
    pub fn settle_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.settle_delay_secs).unwrap_or_else(|err| {
            warn!(
                settle_delay_secs = self.settle_delay_secs,
                %err,
                "Unusable settle delay, using default"
            );
            Duration::from_secs_f64(DEFAULT_SETTLE_DELAY_SECS)
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Duration::try_from_secs_f64(self.settle_delay_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "settle_delay_secs must be a non-negative number of seconds that fits a Duration, got {}",
                self.settle_delay_secs
            )));
        }
        if self.group_count == 0 {
            return Err(ConfigError::Invalid(
                "group_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
