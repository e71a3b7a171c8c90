use super::pool::{LiquidityProvider, Quote};
use crate::utils::Token;
use crate::utils::amounts::u256_to_f64;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// x·y=k pool. `fee` is a fraction of the input, e.g. 0.003.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantProductPool {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub reserve0: U256,
    pub reserve1: U256,
    pub fee: f64,
    #[serde(default)]
    pub provider: LiquidityProvider,
}

impl ConstantProductPool {
    pub fn new(address: Address, token0: Token, token1: Token, reserve0: U256, reserve1: U256, fee: f64) -> Self {
        Self { address, token0, token1, reserve0, reserve1, fee, provider: LiquidityProvider::SushiSwap }
    }

    pub fn with_provider(mut self, provider: LiquidityProvider) -> Self {
        self.provider = provider;
        self
    }

    fn reserves(&self, zero_for_one: bool) -> (f64, f64) {
        let (reserve_in, reserve_out) = if zero_for_one { (self.reserve0, self.reserve1) } else { (self.reserve1, self.reserve0) };
        (u256_to_f64(reserve_in), u256_to_f64(reserve_out))
    }

    pub fn quote(&self, zero_for_one: bool, amount_in: f64) -> Quote {
        let (reserve_in, reserve_out) = self.reserves(zero_for_one);
        if amount_in <= 0.0 || reserve_in <= 0.0 || reserve_out <= 0.0 {
            return Quote::default();
        }
        let amount_in_with_fee = amount_in * (1.0 - self.fee);
        Quote::new(amount_in_with_fee * reserve_out / (reserve_in + amount_in_with_fee))
    }

    pub fn marginal_rate(&self, zero_for_one: bool) -> f64 {
        let (reserve_in, reserve_out) = self.reserves(zero_for_one);
        if reserve_in <= 0.0 || reserve_out <= 0.0 {
            return 0.0;
        }
        (1.0 - self.fee) * reserve_out / reserve_in
    }

    pub fn liquidity(&self, zero: bool) -> f64 {
        u256_to_f64(if zero { self.reserve0 } else { self.reserve1 })
    }

    pub fn is_dust(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero()
    }
}
