use super::pool::{LiquidityProvider, Quote};
use crate::utils::Token;
use crate::utils::amounts::u256_to_f64;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// 1:1 conversion between a token and its wrapped form, e.g. native wrapping or a vault deposit.
/// `capacity` bounds the output in either direction; `None` never limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgePool {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub capacity: Option<U256>,
    #[serde(default)]
    pub provider: LiquidityProvider,
}

impl BridgePool {
    pub fn unbounded(address: Address, token0: Token, token1: Token) -> Self {
        Self { address, token0, token1, fee: 0.0, capacity: None, provider: LiquidityProvider::NativeWrap }
    }

    pub fn bounded(address: Address, token0: Token, token1: Token, capacity: U256) -> Self {
        Self { address, token0, token1, fee: 0.0, capacity: Some(capacity), provider: LiquidityProvider::BentoBridge }
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }

    pub fn capacity_f64(&self) -> Option<f64> {
        self.capacity.map(u256_to_f64)
    }

    pub fn quote(&self, amount_in: f64) -> Quote {
        if amount_in <= 0.0 {
            return Quote::default();
        }
        let amount_out = amount_in * (1.0 - self.fee);
        match self.capacity_f64() {
            Some(capacity) if amount_out > capacity => Quote { amount_out: capacity, capacity_exceeded: true },
            _ => Quote::new(amount_out),
        }
    }

    pub fn marginal_rate(&self) -> f64 {
        if self.is_dust() { 0.0 } else { 1.0 - self.fee }
    }

    pub fn liquidity(&self) -> f64 {
        self.capacity_f64().unwrap_or(f64::MAX)
    }

    pub fn is_dust(&self) -> bool {
        self.capacity.is_some_and(|capacity| capacity.is_zero())
    }
}
