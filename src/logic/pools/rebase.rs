use crate::utils::amounts::u256_to_f64;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Vault accounting of one token: `elastic` real tokens are represented by `base` shares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebase {
    pub elastic: U256,
    pub base: U256,
}

impl Rebase {
    pub fn new(elastic: U256, base: U256) -> Self {
        Self { elastic, base }
    }

    /// Shares to real amount. An empty vault converts 1:1.
    pub fn to_elastic(&self, shares: U256) -> U256 {
        if self.base.is_zero() {
            return shares;
        }
        shares.saturating_mul(self.elastic) / self.base
    }

    /// Real amount to shares. An empty vault converts 1:1.
    pub fn to_base(&self, elastic: U256) -> U256 {
        if self.elastic.is_zero() {
            return elastic;
        }
        elastic.saturating_mul(self.base) / self.elastic
    }

    pub fn to_elastic_f64(&self, shares: f64) -> f64 {
        if self.base.is_zero() {
            return shares;
        }
        shares * u256_to_f64(self.elastic) / u256_to_f64(self.base)
    }
}
