use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Sha256 over the token and pool addresses of a path, serialized as a 0x prefixed hex string.
/// Orders paths that are otherwise equal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapPathHash(pub B256);

impl Display for SwapPathHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<[u8; 32]> for SwapPathHash {
    fn from(hash: [u8; 32]) -> Self {
        SwapPathHash(B256::from(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_json_is_hex() -> eyre::Result<()> {
        let swap_path_hash = SwapPathHash::from([0xab; 32]);
        let serialized = serde_json::to_string(&swap_path_hash)?;
        assert_eq!(serialized, format!("\"0x{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<SwapPathHash>(&serialized)?, swap_path_hash);
        assert_eq!(swap_path_hash.to_string(), format!("0x{}", "ab".repeat(32)));
        Ok(())
    }

    #[test]
    fn test_rejects_short_hash() {
        assert!(serde_json::from_str::<SwapPathHash>("\"0x0102\"").is_err());
    }
}
