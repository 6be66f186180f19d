//! Exit game parameters.

use std::path::Path;

use plasma_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration parameters controlling exit timing, bonds and exit transaction checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitGameConfig {
    /// Half of the challenge window, in seconds
    pub half_exit_period_secs: u64,
    /// Bond attached to every exit and paid to a successful challenger (wei)
    pub exit_bond: U256,
    /// Marketplace contract on the child chain
    pub marketplace: Address,
    /// Chain id exit and challenge transactions must be signed for, if enforced
    pub child_chain_id: Option<u64>,
}

impl Default for ExitGameConfig {
    fn default() -> Self {
        Self {
            half_exit_period_secs: 302_400, // 3.5 days, so a fresh checkpoint waits a full week
            exit_bond: U256::exp10(17),
            marketplace: Address::zero(),
            child_chain_id: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExitGameConfig {
    /// Load a JSON config; missing fields take their default values
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Full window between a checkpoint and the earliest exit it can back
    pub fn exit_period_secs(&self) -> u64 {
        self.half_exit_period_secs.saturating_mul(2)
    }
}
