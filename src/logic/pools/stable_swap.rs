//! Two-coin stable invariant pool with vault-share reserves.
//!
//! The invariant for n = 2 and `Ann = A·n`:
//! ```text
//! Ann·S + D = Ann·D + D³ / (4·x·y)
//! ```
//! `D` is solved from the current balances, then the new output balance `y` for the increased
//! input balance, both by Newton iteration. Balances are real token amounts (vault elastic)
//! scaled to 18 decimals.

use super::pool::{LiquidityProvider, Quote};
use super::pool_id::PoolId;
use super::rebase::Rebase;
use crate::error::RouterError;
use crate::utils::Token;
use crate::utils::amounts::u256_to_f64;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

const N_COINS: f64 = 2.0;

/// Iteration bound and relative convergence threshold for the invariant solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSolverConfig {
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for NewtonSolverConfig {
    fn default() -> Self {
        Self { max_iterations: 255, tolerance: 1e-12 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StableSwapPool {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    /// Pool balances in vault shares.
    pub reserve0: U256,
    pub reserve1: U256,
    /// Vault totals used to turn shares into real amounts.
    pub total0: Rebase,
    pub total1: Rebase,
    pub amplification: u64,
    pub fee: f64,
    #[serde(default)]
    pub provider: LiquidityProvider,
    #[serde(default)]
    pub solver: NewtonSolverConfig,
}

impl StableSwapPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Address,
        token0: Token,
        token1: Token,
        reserve0: U256,
        reserve1: U256,
        total0: Rebase,
        total1: Rebase,
        amplification: u64,
        fee: f64,
    ) -> Self {
        Self {
            address,
            token0,
            token1,
            reserve0,
            reserve1,
            total0,
            total1,
            amplification,
            fee,
            provider: LiquidityProvider::Trident,
            solver: NewtonSolverConfig::default(),
        }
    }

    pub fn with_solver(mut self, solver: NewtonSolverConfig) -> Self {
        self.solver = solver;
        self
    }

    fn scale(token: &Token) -> f64 {
        10f64.powi(18 - token.get_decimals() as i32)
    }

    /// Real amount of token0 or token1 held by the pool, in raw token units.
    pub fn elastic_reserve(&self, zero: bool) -> f64 {
        if zero {
            self.total0.to_elastic_f64(u256_to_f64(self.reserve0))
        } else {
            self.total1.to_elastic_f64(u256_to_f64(self.reserve1))
        }
    }

    fn oriented(&self, zero_for_one: bool) -> (f64, f64, f64, f64) {
        let x0 = self.elastic_reserve(true) * Self::scale(&self.token0);
        let x1 = self.elastic_reserve(false) * Self::scale(&self.token1);
        if zero_for_one {
            (x0, x1, Self::scale(&self.token0), Self::scale(&self.token1))
        } else {
            (x1, x0, Self::scale(&self.token1), Self::scale(&self.token0))
        }
    }

    fn ann(&self) -> f64 {
        self.amplification as f64 * N_COINS
    }

    fn unstable(&self) -> RouterError {
        RouterError::QuoteUnstable(PoolId::Address(self.address))
    }

    fn compute_d(&self, x: f64, y: f64) -> Result<f64, RouterError> {
        let s = x + y;
        if s == 0.0 {
            return Ok(0.0);
        }
        let ann = self.ann();
        let mut d = s;
        for _ in 0..self.solver.max_iterations {
            let d_p = d * d / (N_COINS * x) * d / (N_COINS * y);
            let d_prev = d;
            let denominator = (ann - 1.0) * d + (N_COINS + 1.0) * d_p;
            if denominator <= 0.0 || !denominator.is_finite() {
                return Err(self.unstable());
            }
            d = (ann * s + N_COINS * d_p) * d / denominator;
            if (d - d_prev).abs() <= self.solver.tolerance * d {
                return Ok(d);
            }
        }
        Err(self.unstable())
    }

    fn compute_y(&self, x_new: f64, d: f64) -> Result<f64, RouterError> {
        let ann = self.ann();
        let c = d * d / (N_COINS * x_new) * d / (N_COINS * ann);
        let b = x_new + d / ann;
        let mut y = d;
        for _ in 0..self.solver.max_iterations {
            let y_prev = y;
            let denominator = 2.0 * y + b - d;
            if denominator <= 0.0 || !denominator.is_finite() {
                return Err(self.unstable());
            }
            y = (y * y + c) / denominator;
            if (y - y_prev).abs() <= self.solver.tolerance * d {
                return Ok(y);
            }
        }
        Err(self.unstable())
    }

    pub fn quote(&self, zero_for_one: bool, amount_in: f64) -> Result<Quote, RouterError> {
        let (x, y, scale_in, scale_out) = self.oriented(zero_for_one);
        if amount_in <= 0.0 || x <= 0.0 || y <= 0.0 || self.amplification == 0 {
            return Ok(Quote::default());
        }
        let d = self.compute_d(x, y)?;
        let x_new = x + amount_in * (1.0 - self.fee) * scale_in;
        let y_new = self.compute_y(x_new, d)?;
        Ok(Quote::new(((y - y_new) / scale_out).max(0.0)))
    }

    /// Zero-size price, measured with an input of 1e-7 of the input reserve.
    pub fn marginal_rate(&self, zero_for_one: bool) -> Result<f64, RouterError> {
        let tiny_amount = self.elastic_reserve(zero_for_one) * 1e-7;
        if tiny_amount <= 0.0 {
            return Ok(0.0);
        }
        Ok(self.quote(zero_for_one, tiny_amount)?.amount_out / tiny_amount)
    }

    pub fn is_dust(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero()
    }
}
