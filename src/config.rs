//! Chain configuration
//!
//! ```toml
//! # ledger.toml
//! cut_off_age = 10
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::constants::CUT_OFF_AGE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cut_off_age must be at least 1")]
    InvalidCutOffAge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainConfig {
    /// How far below the tallest node a block may still attach, and how long nodes are retained
    cut_off_age: u64,
}

/// On-disk form; only reachable through validation
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChainConfig {
    #[serde(default = "default_cut_off_age")]
    cut_off_age: u64,
}

fn default_cut_off_age() -> u64 {
    CUT_OFF_AGE
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            cut_off_age: CUT_OFF_AGE,
        }
    }
}

impl ChainConfig {
    pub fn with_cut_off_age(cut_off_age: u64) -> Result<Self, ConfigError> {
        Self { cut_off_age }.validated()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawChainConfig = toml::from_str(source)?;
        Self::with_cut_off_age(raw.cut_off_age)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn cut_off_age(&self) -> u64 {
        self.cut_off_age
    }

    fn validated(self) -> Result<Self, ConfigError> {
        // With zero no block could ever extend the tip
        if self.cut_off_age == 0 {
            return Err(ConfigError::InvalidCutOffAge);
        }
        Ok(self)
    }
}
