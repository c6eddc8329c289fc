//! Ledger configuration
//!
//! Defaults are difficulty 2, a reward of 1 per mined block and a
//! 100-coin genesis allocation. A JSON file can override any subset of
//! the fields.

use crate::core::Amount;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Number of leading zero hex digits required of a block hash
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Reward paid to the miner when the caller does not name one
pub const DEFAULT_REWARD: Amount = 1;

/// Genesis timestamp: 2023-01-01T00:00:00Z in unix milliseconds
pub const GENESIS_TIMESTAMP: i64 = 1_672_531_200_000;

/// Beneficiary of the genesis allocation
pub const GENESIS_RECIPIENT: &str = "04c3cb3cf68bda5dbc1a8acdf4a9b3988ce49fa8dd8d682a2e8bad11d3eee8194bef462310382ac979632c36ddff5f99571a1ad70992f32518e0de8db9f7bfb61e";

pub const GENESIS_AMOUNT: Amount = 100;

pub const GENESIS_CONTRIBUTION: &str = "This is the genesis block of the Action Chain.";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters of the genesis block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub timestamp: i64,
    pub recipient: String,
    pub amount: Amount,
    pub contribution: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            recipient: GENESIS_RECIPIENT.to_string(),
            amount: GENESIS_AMOUNT,
            contribution: GENESIS_CONTRIBUTION.to_string(),
        }
    }
}

/// Chain-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub difficulty: usize,
    pub default_reward: Amount,
    pub genesis: GenesisConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            default_reward: DEFAULT_REWARD,
            genesis: GenesisConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Default settings with the genesis allocation paid to `recipient`
    pub fn with_genesis_recipient(recipient: &str) -> Self {
        Self {
            genesis: GenesisConfig {
                recipient: recipient.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load settings from a JSON file; missing fields take defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
