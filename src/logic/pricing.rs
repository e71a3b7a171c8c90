use super::graph::{FastHashMap, TokenGraph};
use crate::utils::constants::{NATIVE, wrapped_native};
use alloy_primitives::Address;
use petgraph::visit::EdgeRef;
use std::collections::VecDeque;
use tracing::debug;

/// Marginal prices of the graph tokens, in raw units of a base token per raw unit of the token.
#[derive(Debug, Clone, Default)]
pub struct TokenPrices {
    base: Address,
    prices: FastHashMap<Address, f64>,
}

impl TokenPrices {
    /// Breadth-first walk from `base`. Each newly reached token is priced through the pool with
    /// the most liquidity on the side of the already priced token.
    pub fn compute(token_graph: &TokenGraph, base: Address) -> Self {
        let mut prices = FastHashMap::default();
        let Some(base_node) = token_graph.token_index.get(&base) else {
            return Self { base, prices };
        };
        prices.insert(base, 1.0);

        let mut queue = VecDeque::from([*base_node]);
        while let Some(node) = queue.pop_front() {
            let Some(known) = token_graph.graph.node_weight(node).map(|n| n.token.get_address()) else {
                continue;
            };
            let known_price = prices.get(&known).copied().unwrap_or_default();

            for edge in token_graph.graph.edges(node) {
                let Some(unknown) = token_graph.graph.node_weight(edge.target()).map(|n| n.token.get_address()) else {
                    continue;
                };
                if prices.contains_key(&unknown) {
                    continue;
                }

                let deepest = edge
                    .weight()
                    .values()
                    .filter(|pool| pool.is_active)
                    .map(|pool| &pool.inner)
                    .max_by(|a, b| a.liquidity(known).total_cmp(&b.liquidity(known)));
                let Some(pool) = deepest else {
                    continue;
                };

                match pool.marginal_rate(unknown) {
                    Ok(rate) if rate > 0.0 => {
                        prices.insert(unknown, known_price * rate);
                        queue.push_back(edge.target());
                    }
                    Ok(_) => {}
                    Err(e) => debug!("Pricing skipped pool={} error={}", pool, e),
                }
            }
        }

        Self { base, prices }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn price(&self, token: &Address) -> Option<f64> {
        self.prices.get(token).copied()
    }

    /// Price of one wei of the chain's native asset, through the native sentinel or the wrapped native token.
    pub fn native_price(&self, chain_id: u64) -> Option<f64> {
        self.price(&NATIVE).or_else(|| wrapped_native(chain_id).and_then(|wrapped| self.price(&wrapped)))
    }

    /// Cost of one gas unit in raw units of the base token. Zero when the native asset cannot be priced.
    pub fn gas_unit_cost(&self, chain_id: u64, gas_price_wei: f64) -> f64 {
        match self.native_price(chain_id) {
            Some(price) => gas_price_wei * price,
            None => {
                if gas_price_wei > 0.0 {
                    debug!("Native asset not reachable from base={:#}, gas ignored", self.base);
                }
                0.0
            }
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::{BridgePool, ConstantProductPool, PoolWrapper};
    use crate::utils::Token;
    use crate::utils::constants::{ChainId, WETH};
    use alloy_primitives::U256;

    fn pool(token0: &Token, token1: &Token, address: u8, reserve0: u64, reserve1: u64) -> PoolWrapper {
        PoolWrapper::from(ConstantProductPool::new(
            Address::repeat_byte(address),
            token0.clone(),
            token1.clone(),
            U256::from(reserve0),
            U256::from(reserve1),
            0.0,
        ))
    }

    #[test]
    fn test_prices_follow_marginal_rates() -> eyre::Result<()> {
        let usdc = Token::repeat_byte(1);
        let dai = Token::repeat_byte(2);
        let weth = Token::new(ChainId::ETHEREUM, WETH);

        let mut token_graph = TokenGraph::new();
        // 1 weth = 2000 usdc
        token_graph.add_pool(pool(&weth, &usdc, 10, 1_000, 2_000_000))?;
        // 1 usdc = 2 dai
        token_graph.add_pool(pool(&usdc, &dai, 11, 1_000_000, 2_000_000))?;

        let prices = TokenPrices::compute(&token_graph, usdc.get_address());
        assert_eq!(prices.price(&usdc.get_address()), Some(1.0));
        assert_eq!(prices.price(&weth.get_address()), Some(2000.0));
        assert_eq!(prices.price(&dai.get_address()), Some(0.5));
        assert_eq!(prices.native_price(ChainId::ETHEREUM), Some(2000.0));
        assert_eq!(prices.gas_unit_cost(ChainId::ETHEREUM, 2.0), 4000.0);
        Ok(())
    }

    #[test]
    fn test_deepest_pool_prices() -> eyre::Result<()> {
        let usdc = Token::repeat_byte(1);
        let dai = Token::repeat_byte(2);

        let mut token_graph = TokenGraph::new();
        token_graph.add_pool(pool(&usdc, &dai, 10, 100, 300))?;
        token_graph.add_pool(pool(&usdc, &dai, 11, 1_000_000, 1_000_000))?;

        let prices = TokenPrices::compute(&token_graph, usdc.get_address());
        assert_eq!(prices.price(&dai.get_address()), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_native_sentinel_and_missing_native() -> eyre::Result<()> {
        let usdc = Token::repeat_byte(1);
        let dai = Token::repeat_byte(2);
        let native = Token::native(ChainId::ETHEREUM);
        let weth = Token::new(ChainId::ETHEREUM, WETH);

        let mut token_graph = TokenGraph::new();
        token_graph.add_pool(pool(&usdc, &dai, 10, 1_000, 1_000))?;
        let prices = TokenPrices::compute(&token_graph, usdc.get_address());
        assert_eq!(prices.native_price(ChainId::ETHEREUM), None);
        assert_eq!(prices.gas_unit_cost(ChainId::ETHEREUM, 100.0), 0.0);

        token_graph.add_pool(BridgePool::unbounded(Address::repeat_byte(20), native.clone(), weth.clone()))?;
        token_graph.add_pool(pool(&weth, &usdc, 11, 1_000, 3_000_000))?;
        let prices = TokenPrices::compute(&token_graph, usdc.get_address());
        assert_eq!(prices.native_price(ChainId::ETHEREUM), Some(3000.0));
        assert_eq!(prices.len(), 4);

        // an unknown base prices nothing
        assert!(TokenPrices::compute(&token_graph, Address::repeat_byte(99)).is_empty());
        Ok(())
    }
}
