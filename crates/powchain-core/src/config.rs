use serde::{Deserialize, Serialize};

use crate::constants::{GENESIS_PAYLOAD, MAX_TARGET_BITS, POW_TARGET_DIFFICULTY};
use crate::error::{ChainError, Result};

/// Miner settings threaded into `ProofOfWork` and `Blockchain` construction.
///
/// Every field has a default, so `{}` is a valid JSON document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Required leading zero bits of a block digest.
    #[serde(default = "default_target_bits")]
    pub target_bits: u32,
    /// Highest nonce the miner tries before giving up.
    #[serde(default = "default_max_nonce")]
    pub max_nonce: u64,
    /// Split the nonce search across the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_genesis_payload")]
    pub genesis_payload: String,
}

fn default_target_bits() -> u32 {
    POW_TARGET_DIFFICULTY
}

fn default_max_nonce() -> u64 {
    u64::MAX
}

fn default_genesis_payload() -> String {
    GENESIS_PAYLOAD.to_string()
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            target_bits: default_target_bits(),
            max_nonce: default_max_nonce(),
            parallel: false,
            genesis_payload: default_genesis_payload(),
        }
    }
}

impl MinerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|e| ChainError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_bits > MAX_TARGET_BITS {
            return Err(ChainError::InvalidTargetBits(self.target_bits));
        }
        Ok(())
    }
}
