/// Engine configuration, loadable from `config.ron`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Controls what missing content looks like and whether it is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentMode {
    /// Missing keys render as `MISSING_TEXTKEY: <key>` and are logged.
    Development,
    /// Missing keys render as `...`.
    Production,
}

impl Default for ContentMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub content_mode: ContentMode,
    /// Delay before a legacy terminal node requests the end overlay.
    pub end_delay_ms: u64,
    /// Fixed seed for variant draws. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_mode: ContentMode::default(),
            end_delay_ms: 1500,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn end_delay(&self) -> Duration {
        Duration::from_millis(self.end_delay_ms)
    }
}
