use crate::logic::pools::{Pool, PoolId, PoolWrapper, Rebase};
use crate::utils::Token;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use eyre::{Result, eyre};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Pools of one token pair as seen at one block.
#[derive(Debug, Clone, Default)]
pub struct FetchedPools {
    pub block_number: u64,
    pub pools: Vec<PoolWrapper>,
}

/// Source of pool state, e.g. an RPC backed multicall reader.
///
/// `fetch_pools` builds complete pool snapshots. The low level accessors read single on-chain values and
/// are used to cross check snapshots.
#[async_trait]
pub trait PoolDataFetcher: Send + Sync {
    async fn fetch_pools(&self, token_a: &Token, token_b: &Token) -> Result<FetchedPools>;

    async fn current_block(&self) -> Result<u64>;

    /// `getReserves` of a pair contract. Stable pools report real token amounts, not vault shares.
    async fn pair_reserves(&self, pool: Address) -> Result<(U256, U256)>;

    /// Vault totals of a token.
    async fn vault_totals(&self, token: Address) -> Result<Rebase>;

    async fn bridge_capacity(&self, pool: Address) -> Result<Option<U256>>;
}

#[derive(Debug, Default)]
struct StaticState {
    block_number: u64,
    pools: BTreeMap<PoolId, PoolWrapper>,
    failing: bool,
}

/// In-memory fetcher serving a fixed set of pools. The state can be changed between fetches.
#[derive(Debug, Default)]
pub struct StaticPoolFetcher {
    state: RwLock<StaticState>,
    fetch_count: AtomicUsize,
}

impl StaticPoolFetcher {
    pub fn new(block_number: u64, pools: Vec<PoolWrapper>) -> Self {
        let pools = pools.into_iter().map(|pool| (pool.get_pool_id(), pool)).collect();
        Self { state: RwLock::new(StaticState { block_number, pools, failing: false }), fetch_count: AtomicUsize::new(0) }
    }

    pub async fn set_block_number(&self, block_number: u64) {
        self.state.write().await.block_number = block_number;
    }

    /// Insert or replace a pool
    pub async fn upsert_pool(&self, pool: PoolWrapper) {
        self.state.write().await.pools.insert(pool.get_pool_id(), pool);
    }

    pub async fn remove_pool(&self, pool_id: &PoolId) -> Option<PoolWrapper> {
        self.state.write().await.pools.remove(pool_id)
    }

    /// Every call fails while set
    pub async fn set_failing(&self, failing: bool) {
        self.state.write().await.failing = failing;
    }

    /// Number of `fetch_pools` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    async fn pool(&self, address: Address) -> Result<PoolWrapper> {
        let state = self.state.read().await;
        if state.failing {
            return Err(eyre!("Fetcher unavailable"));
        }
        state.pools.get(&PoolId::Address(address)).cloned().ok_or_else(|| eyre!("Unknown pool {:#}", address))
    }
}

#[async_trait]
impl PoolDataFetcher for StaticPoolFetcher {
    async fn fetch_pools(&self, token_a: &Token, token_b: &Token) -> Result<FetchedPools> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read().await;
        if state.failing {
            return Err(eyre!("Fetcher unavailable"));
        }
        let pools = state.pools.values().filter(|pool| pool.connects(token_a.get_address(), token_b.get_address())).cloned().collect();
        Ok(FetchedPools { block_number: state.block_number, pools })
    }

    async fn current_block(&self) -> Result<u64> {
        let state = self.state.read().await;
        if state.failing {
            return Err(eyre!("Fetcher unavailable"));
        }
        Ok(state.block_number)
    }

    async fn pair_reserves(&self, pool: Address) -> Result<(U256, U256)> {
        match self.pool(pool).await?.pool.as_ref() {
            Pool::ConstantProduct(pool) => Ok((pool.reserve0, pool.reserve1)),
            Pool::StableSwap(pool) => Ok((pool.total0.to_elastic(pool.reserve0), pool.total1.to_elastic(pool.reserve1))),
            Pool::Bridge(_) => Err(eyre!("Bridge {:#} has no reserves", pool)),
        }
    }

    async fn vault_totals(&self, token: Address) -> Result<Rebase> {
        let state = self.state.read().await;
        if state.failing {
            return Err(eyre!("Fetcher unavailable"));
        }
        state
            .pools
            .values()
            .find_map(|pool| match pool.pool.as_ref() {
                Pool::StableSwap(pool) if pool.token0.get_address() == token => Some(pool.total0),
                Pool::StableSwap(pool) if pool.token1.get_address() == token => Some(pool.total1),
                _ => None,
            })
            .ok_or_else(|| eyre!("No vault totals for {:#}", token))
    }

    async fn bridge_capacity(&self, pool: Address) -> Result<Option<U256>> {
        match self.pool(pool).await?.pool.as_ref() {
            Pool::Bridge(bridge) => Ok(bridge.capacity),
            _ => Err(eyre!("Pool {:#} is not a bridge", pool)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::{BridgePool, ConstantProductPool, StableSwapPool};

    #[tokio::test]
    async fn test_static_fetcher() -> Result<()> {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let token_c = Token::repeat_byte(3);
        let cp = ConstantProductPool::new(Address::repeat_byte(10), token_a.clone(), token_b.clone(), U256::from(1000u64), U256::from(2000u64), 0.003);
        let stable = StableSwapPool::new(
            Address::repeat_byte(11),
            token_b.clone(),
            token_c.clone(),
            U256::from(500u64),
            U256::from(600u64),
            Rebase::new(U256::from(2000u64), U256::from(1000u64)),
            Rebase::default(),
            100,
            0.0005,
        );
        let bridge = BridgePool::bounded(Address::repeat_byte(12), token_a.clone(), token_c.clone(), U256::from(77u64));
        let fetcher = StaticPoolFetcher::new(5, vec![cp.into(), stable.into(), bridge.into()]);

        let fetched = fetcher.fetch_pools(&token_b, &token_a).await?;
        assert_eq!(fetched.block_number, 5);
        assert_eq!(fetched.pools.len(), 1);
        assert_eq!(fetcher.fetch_count(), 1);

        assert_eq!(fetcher.pair_reserves(Address::repeat_byte(10)).await?, (U256::from(1000u64), U256::from(2000u64)));
        // stable reserves come back as real amounts
        assert_eq!(fetcher.pair_reserves(Address::repeat_byte(11)).await?, (U256::from(1000u64), U256::from(600u64)));
        assert_eq!(fetcher.vault_totals(token_b.get_address()).await?, Rebase::new(U256::from(2000u64), U256::from(1000u64)));
        assert_eq!(fetcher.bridge_capacity(Address::repeat_byte(12)).await?, Some(U256::from(77u64)));
        assert!(fetcher.bridge_capacity(Address::repeat_byte(10)).await.is_err());

        fetcher.set_block_number(6).await;
        assert_eq!(fetcher.current_block().await?, 6);

        fetcher.set_failing(true).await;
        assert!(fetcher.fetch_pools(&token_a, &token_b).await.is_err());
        assert!(fetcher.current_block().await.is_err());
        Ok(())
    }
}
