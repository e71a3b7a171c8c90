use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};

/// Block header as delivered by a newHeads subscription, with hex quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde(rename = "number")]
    pub number: String,
    #[serde(rename = "hash", default)]
    pub hash: String,
    #[serde(rename = "parentHash", default)]
    pub parent_hash: String,
    #[serde(rename = "timestamp")]
    pub timestamp: String,
}

impl BlockHeader {
    pub fn new(number: u64, timestamp: u64) -> Self {
        Self { number: format!("{number:#x}"), hash: String::new(), parent_hash: String::new(), timestamp: format!("{timestamp:#x}") }
    }

    /// Parse block number from hex string
    pub fn block_number(&self) -> Result<u64> {
        let num_str = self.number.trim_start_matches("0x");
        u64::from_str_radix(num_str, 16).map_err(|e| eyre!("Invalid block number format: {}", e))
    }

    /// Parse timestamp from hex string
    pub fn timestamp_secs(&self) -> Result<u64> {
        let ts_str = self.timestamp.trim_start_matches("0x");
        u64::from_str_radix(ts_str, 16).map_err(|e| eyre!("Invalid timestamp format: {}", e))
    }
}
