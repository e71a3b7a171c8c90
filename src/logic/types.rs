use super::pools::{LiquidityProvider, PoolClass, PoolId};
use crate::error::RouterError;
use crate::utils::Token;
use crate::utils::amounts::f64_to_u256;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Outcome of a route search.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    /// The whole input amount is placed.
    Success,
    /// No path connects the two tokens.
    NoWay,
    /// Only part of the amount could be placed, or the search budget ran out before the distribution was optimized.
    Partial,
}

/// One pool hop of a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub pool_id: PoolId,
    pub pool_address: Address,
    pub pool_class: PoolClass,
    pub provider: LiquidityProvider,
    pub token_from: Token,
    pub token_to: Token,
    /// Raw units of `token_from` sent into the pool
    pub assumed_amount_in: f64,
    /// Raw units of `token_to` expected out of the pool
    pub assumed_amount_out: f64,
    /// Fraction of the balance of `token_from` still held when this leg executes. The last leg of a token takes 1.0.
    pub swap_portion: f64,
    /// Fraction of the total outflow of `token_from`
    pub absolute_portion: f64,
    /// The pool is used up to its capacity
    pub capacity_exceeded: bool,
}

/// Result of a route search. Amounts are raw token units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub status: RouteStatus,
    pub from_token: Token,
    pub to_token: Token,
    /// Placed input amount. Lower than the requested amount only for a partial route.
    pub amount_in: f64,
    pub amount_in_wei: U256,
    pub amount_out: f64,
    pub amount_out_wei: U256,
    /// Legs in execution order: every leg of a token comes after all legs bringing that token in.
    pub legs: Vec<Leg>,
    pub gas_spent: u64,
    /// Output minus gas cost priced in the output token
    pub total_amount_out: f64,
    pub price_impact: f64,
}

impl Route {
    pub fn no_way(from_token: Token, to_token: Token) -> Self {
        Self::empty(RouteStatus::NoWay, from_token, to_token, 0.0, 0.0)
    }

    /// Swapping a token into itself: nothing to execute, the output is the input.
    pub fn identity(token: Token, amount_in: f64) -> Self {
        Self::empty(RouteStatus::Success, token.clone(), token, amount_in, amount_in)
    }

    pub fn zero(from_token: Token, to_token: Token) -> Self {
        Self::empty(RouteStatus::Success, from_token, to_token, 0.0, 0.0)
    }

    fn empty(status: RouteStatus, from_token: Token, to_token: Token, amount_in: f64, amount_out: f64) -> Self {
        Self {
            status,
            from_token,
            to_token,
            amount_in,
            amount_in_wei: f64_to_u256(amount_in),
            amount_out,
            amount_out_wei: f64_to_u256(amount_out),
            legs: vec![],
            gas_spent: 0,
            total_amount_out: amount_out,
            price_impact: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RouteStatus::Success
    }

    /// Legs whose pool ran at its capacity, as errors carrying the requested and available amounts.
    pub fn capacity_exceeded_legs(&self) -> Vec<RouterError> {
        self.legs
            .iter()
            .filter(|leg| leg.capacity_exceeded)
            .map(|leg| RouterError::CapacityExceeded {
                pool: leg.pool_id,
                requested: leg.assumed_amount_in,
                available: leg.assumed_amount_out,
            })
            .collect()
    }

    /// Sum of the absolute portions of the legs leaving the input token.
    pub fn root_portion(&self) -> f64 {
        self.legs.iter().filter(|leg| leg.token_from == self.from_token).map(|leg| leg.absolute_portion).sum()
    }
}

/// Search settings of the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Maximum number of pools on one path
    pub max_hops: usize,
    /// Maximum number of candidate paths collected per search
    pub max_paths: usize,
    /// Step counts tried by the flow distribution. The best run wins.
    pub distribution_steps: Vec<usize>,
    /// Run the step counts on the rayon pool
    pub enable_parallel_calculation: bool,
    /// Wall clock budget of one search. An expired budget yields a partial route.
    pub deadline_ms: Option<u64>,
    /// Budget of distribution iterations over all runs
    pub max_iterations: usize,
    /// Provider family used by the special route search
    pub special_providers: Vec<LiquidityProvider>,
    /// Pools with less output liquidity than this, in raw units, are ignored
    pub min_liquidity: f64,
    /// Pools whose deepest side, priced in the input token, holds less than this fraction of the
    /// input amount are ignored
    pub min_liquidity_share: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_hops: 4,
            max_paths: 1_000,
            distribution_steps: vec![1, 2, 4, 10, 20, 40],
            enable_parallel_calculation: true,
            deadline_ms: None,
            max_iterations: 10_000,
            special_providers: vec![
                LiquidityProvider::SushiSwap,
                LiquidityProvider::Trident,
                LiquidityProvider::NativeWrap,
                LiquidityProvider::BentoBridge,
            ],
            min_liquidity: 0.0,
            min_liquidity_share: 1e-6,
        }
    }
}
