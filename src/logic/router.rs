use super::distribution::{SearchBudget, best_distribution};
use super::graph::{SwapPath, TokenGraph, find_all_paths};
use super::pools::{LiquidityProvider, Pool, PoolClass, PoolFilter, PoolId, PoolWrapper};
use super::pricing::TokenPrices;
use super::types::{Route, RouteStatus, RouterConfig};
use crate::data_sync::RegistrySnapshot;
use crate::utils::Token;
use crate::utils::amounts::{f64_to_u256, u256_to_f64};
use alloy_primitives::{Address, U256};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Route search engine. Stateless between calls, so one router may serve concurrent searches.
#[derive(Debug, Clone, Default)]
pub struct Router {
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Best split route for `amount_in` raw units of `token_in` into `token_out` over the snapshot pools.
    ///
    /// Gas is charged per used pool at `gas_price_wei` and converted into `token_out` through the marginal
    /// prices of the graph. `providers` and `pool_filter` restrict the pools the search may use.
    #[allow(clippy::too_many_arguments)]
    pub fn find_best_route(
        &self,
        snapshot: &RegistrySnapshot,
        chain_id: u64,
        token_in: &Token,
        amount_in: U256,
        token_out: &Token,
        gas_price_wei: U256,
        providers: Option<&[LiquidityProvider]>,
        pool_filter: Option<&PoolFilter>,
    ) -> Route {
        let started = Instant::now();
        let amount = u256_to_f64(amount_in);

        if token_in == token_out {
            return Route::identity(token_in.clone(), amount);
        }
        if amount_in.is_zero() {
            return Route::zero(token_in.clone(), token_out.clone());
        }

        let mut token_graph = self.build_graph(snapshot, chain_id, providers, pool_filter);
        self.deactivate_shallow_pools(&mut token_graph, token_in.get_address(), amount);
        let paths = match find_all_paths(&token_graph, token_in.get_address(), token_out.get_address(), self.config.max_hops, self.config.max_paths) {
            Ok(paths) => paths.sorted_vec(),
            Err(e) => {
                warn!("Path search failed token_in={:#} token_out={:#} error={}", token_in.get_address(), token_out.get_address(), e);
                return Route::no_way(token_in.clone(), token_out.clone());
            }
        };
        let paths: Vec<SwapPath> = paths.into_iter().filter(|path| quotes_output(path, amount)).collect();
        if paths.is_empty() {
            debug!("No way token_in={:#} token_out={:#} pools={}", token_in.get_address(), token_out.get_address(), token_graph.pools.len());
            return Route::no_way(token_in.clone(), token_out.clone());
        }

        let prices = TokenPrices::compute(&token_graph, token_out.get_address());
        let gas_unit_cost = prices.gas_unit_cost(chain_id, u256_to_f64(gas_price_wei));
        let budget = SearchBudget::new(self.config.deadline_ms.map(Duration::from_millis), self.config.max_iterations);

        let Some(distribution) = best_distribution(
            &paths,
            amount,
            &self.config.distribution_steps,
            gas_unit_cost,
            self.config.enable_parallel_calculation,
            &budget,
        ) else {
            return Route::no_way(token_in.clone(), token_out.clone());
        };

        let legs = match distribution.build_legs() {
            Ok(legs) => legs,
            Err(e) => {
                warn!("Leg ordering failed token_in={:#} token_out={:#} error={}", token_in.get_address(), token_out.get_address(), e);
                return Route::no_way(token_in.clone(), token_out.clone());
            }
        };

        let fully_placed = distribution.is_fully_placed(amount);
        let status = if distribution.budget_expired || !fully_placed { RouteStatus::Partial } else { RouteStatus::Success };
        let amount_placed = if fully_placed { amount } else { distribution.amount_placed };
        let best_rate = paths.iter().filter_map(marginal_path_rate).fold(0.0, f64::max);
        let price_impact = if best_rate > 0.0 { (1.0 - distribution.amount_out / (amount_placed * best_rate)).clamp(0.0, 1.0) } else { 0.0 };

        debug!(
            "Route found status={} steps={} legs={} paths={} iterations={} amount_out={} gas={} elapsed={:?}",
            status,
            distribution.steps,
            legs.len(),
            paths.len(),
            budget.iterations(),
            distribution.amount_out,
            distribution.gas_spent,
            started.elapsed()
        );

        Route {
            status,
            from_token: token_in.clone(),
            to_token: token_out.clone(),
            amount_in: amount_placed,
            amount_in_wei: if fully_placed { amount_in } else { f64_to_u256(amount_placed) },
            amount_out: distribution.amount_out,
            amount_out_wei: f64_to_u256(distribution.amount_out),
            legs,
            gas_spent: distribution.gas_spent,
            total_amount_out: distribution.net_output(),
            price_impact,
        }
    }

    /// Search restricted to the special provider family, falling back to every provider when that finds no way.
    #[allow(clippy::too_many_arguments)]
    pub fn find_special_route(
        &self,
        snapshot: &RegistrySnapshot,
        chain_id: u64,
        token_in: &Token,
        amount_in: U256,
        token_out: &Token,
        gas_price_wei: U256,
        pool_filter: Option<&PoolFilter>,
    ) -> Route {
        let special = self.find_best_route(
            snapshot,
            chain_id,
            token_in,
            amount_in,
            token_out,
            gas_price_wei,
            Some(&self.config.special_providers),
            pool_filter,
        );
        if special.status != RouteStatus::NoWay {
            return special;
        }
        debug!("Special providers found no way, searching all token_in={:#} token_out={:#}", token_in.get_address(), token_out.get_address());
        self.find_best_route(snapshot, chain_id, token_in, amount_in, token_out, gas_price_wei, None, pool_filter)
    }

    /// Graph over the usable snapshot pools. Dust pools and pools that cannot be priced are dropped.
    pub fn build_graph(
        &self,
        snapshot: &RegistrySnapshot,
        chain_id: u64,
        providers: Option<&[LiquidityProvider]>,
        pool_filter: Option<&PoolFilter>,
    ) -> TokenGraph {
        let mut token_graph = TokenGraph::new();
        for pool in snapshot.pools.values() {
            if pool.token0().get_chain_id() != chain_id {
                continue;
            }
            if providers.is_some_and(|providers| !providers.contains(&pool.get_provider())) {
                continue;
            }
            if pool_filter.is_some_and(|filter| !filter(pool.pool.as_ref())) {
                continue;
            }
            if !self.is_usable(pool) {
                continue;
            }
            if let Err(e) = token_graph.add_pool(pool.clone()) {
                debug!("Pool skipped pool={} error={}", pool, e);
            }
        }
        token_graph
    }

    /// Turns off pools holding less than `min_liquidity_share` of the input amount. A pool's depth is
    /// its deepest side priced in `token_in`. Pools whose tokens cannot be priced stay active.
    fn deactivate_shallow_pools(&self, token_graph: &mut TokenGraph, token_in: Address, amount_in: f64) {
        let threshold = amount_in * self.config.min_liquidity_share;
        if threshold <= 0.0 {
            return;
        }
        let prices = TokenPrices::compute(token_graph, token_in);

        let shallow: Vec<PoolId> = token_graph
            .pools
            .values()
            .filter(|pool| {
                let depth = pool
                    .get_swap_directions()
                    .into_iter()
                    .filter_map(|(_, token_to)| prices.price(&token_to).map(|price| pool.liquidity(token_to) * price))
                    .reduce(f64::max);
                depth.is_some_and(|depth| depth < threshold)
            })
            .map(|pool| pool.get_pool_id())
            .collect();

        for pool_id in shallow {
            match token_graph.set_pool_active(pool_id, false) {
                Ok(()) => debug!("Shallow pool deactivated pool={} threshold={}", pool_id, threshold),
                Err(e) => warn!("Pool deactivation failed pool={} error={}", pool_id, e),
            }
        }
    }

    fn is_usable(&self, pool: &PoolWrapper) -> bool {
        if pool.is_dust() {
            debug!("Dust pool pruned pool={}", pool);
            return false;
        }
        for (token_from, token_to) in pool.get_swap_directions() {
            if pool.liquidity(token_to) < self.config.min_liquidity {
                debug!("Shallow pool pruned pool={}", pool);
                return false;
            }
            if let Err(e) = pool.marginal_rate(token_from) {
                debug!("Unstable pool pruned pool={} error={}", pool, e);
                return false;
            }
        }
        true
    }
}

fn quotes_output(path: &SwapPath, amount_in: f64) -> bool {
    let mut amount = amount_in;
    for (token_from, pool, _) in path.hops() {
        match pool.quote_output(token_from.get_address(), amount) {
            Ok(quote) if quote.amount_out > 0.0 => amount = quote.amount_out,
            _ => return false,
        }
    }
    true
}

fn marginal_path_rate(path: &SwapPath) -> Option<f64> {
    path.hops().try_fold(1.0, |rate, (token_from, pool, _)| pool.marginal_rate(token_from.get_address()).ok().map(|r| rate * r))
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    config: RouterConfig,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self { config: RouterConfig::default() }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.config.max_hops = max_hops;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.config.max_paths = max_paths;
        self
    }

    pub fn with_distribution_steps(mut self, steps: Vec<usize>) -> Self {
        self.config.distribution_steps = steps;
        self
    }

    pub fn with_parallel_calculation(mut self, enabled: bool) -> Self {
        self.config.enable_parallel_calculation = enabled;
        self
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.config.deadline_ms = Some(deadline_ms);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_special_providers(mut self, providers: Vec<LiquidityProvider>) -> Self {
        self.config.special_providers = providers;
        self
    }

    pub fn with_min_liquidity(mut self, min_liquidity: f64) -> Self {
        self.config.min_liquidity = min_liquidity;
        self
    }

    pub fn with_min_liquidity_share(mut self, share: f64) -> Self {
        self.config.min_liquidity_share = share;
        self
    }

    pub fn build(self) -> Router {
        Router::new(self.config)
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps only pools of the given kind, e.g. for a constant product only search.
pub fn pool_kind_filter(kind: PoolClass) -> Box<PoolFilter> {
    Box::new(move |pool: &Pool| pool.get_class() == kind)
}
