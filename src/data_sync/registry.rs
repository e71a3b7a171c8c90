use super::fetcher::PoolDataFetcher;
use crate::error::RouterError;
use crate::logic::pools::{PoolId, PoolWrapper};
use crate::utils::Token;
use crate::utils::constants::wrapped_native;
use alloy_primitives::Address;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Unordered token pair, stored with the lower address first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenPairKey {
    pub token_a: Address,
    pub token_b: Address,
}

impl TokenPairKey {
    pub fn new(token_x: Address, token_y: Address) -> Self {
        if token_x <= token_y { Self { token_a: token_x, token_b: token_y } } else { Self { token_a: token_y, token_b: token_x } }
    }
}

/// Pools of one pair at one block. Replaced as a whole on refresh.
#[derive(Debug, Clone, Default)]
pub struct PoolSet {
    pub block_number: u64,
    pub pools: BTreeMap<PoolId, PoolWrapper>,
}

impl PoolSet {
    pub fn new(block_number: u64, pools: Vec<PoolWrapper>) -> Self {
        Self { block_number, pools: pools.into_iter().map(|pool| (pool.get_pool_id(), pool)).collect() }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Point in time view of a set of pools, read by the router without locking.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Oldest block among the pairs in the snapshot
    pub block_number: u64,
    pub pools: BTreeMap<PoolId, PoolWrapper>,
}

impl RegistrySnapshot {
    pub fn from_pools(block_number: u64, pools: Vec<PoolWrapper>) -> Self {
        Self { block_number, pools: pools.into_iter().map(|pool| (pool.get_pool_id(), pool)).collect() }
    }

    pub fn get_pool(&self, pool_id: &PoolId) -> Option<&PoolWrapper> {
        self.pools.get(pool_id)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// `StaleData` when the snapshot lags `current_height` by more than `max_age` blocks.
    pub fn ensure_fresh(&self, current_height: u64, max_age: u64) -> Result<(), RouterError> {
        if current_height.saturating_sub(self.block_number) > max_age {
            return Err(RouterError::StaleData { snapshot_height: self.block_number, current_height, max_age });
        }
        Ok(())
    }
}

/// Concurrent cache of pool state keyed by token pair.
///
/// Readers get the published `Arc<PoolSet>` of a pair and never wait on a refresh. A refresh replaces the
/// whole set of a pair at once, and a set older than the cached one is dropped.
pub struct PoolRegistry {
    fetcher: Arc<dyn PoolDataFetcher>,
    chain_id: u64,
    base_tokens: Vec<Token>,
    pairs: DashMap<TokenPairKey, Arc<PoolSet>>,
    tokens: DashMap<Address, Token>,
    last_update_height: AtomicU64,
}

impl PoolRegistry {
    pub fn new(fetcher: Arc<dyn PoolDataFetcher>, chain_id: u64) -> Self {
        Self {
            fetcher,
            chain_id,
            base_tokens: vec![],
            pairs: DashMap::new(),
            tokens: DashMap::new(),
            last_update_height: AtomicU64::new(0),
        }
    }

    /// Tokens paired with both ends of every search, e.g. stable coins and the wrapped native token.
    pub fn with_base_tokens(mut self, base_tokens: Vec<Token>) -> Self {
        self.base_tokens = base_tokens;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn fetcher(&self) -> &Arc<dyn PoolDataFetcher> {
        &self.fetcher
    }

    /// Highest block any publish came from. Never decreases.
    pub fn last_update_height(&self) -> u64 {
        self.last_update_height.load(Ordering::Acquire)
    }

    /// Cached pools of a pair, empty when the pair was never fetched.
    pub fn get_pools(&self, token_a: Address, token_b: Address) -> Arc<PoolSet> {
        self.pairs.get(&TokenPairKey::new(token_a, token_b)).map(|entry| entry.value().clone()).unwrap_or_default()
    }

    pub fn contains_pair(&self, token_a: Address, token_b: Address) -> bool {
        self.pairs.contains_key(&TokenPairKey::new(token_a, token_b))
    }

    pub fn pairs_count(&self) -> usize {
        self.pairs.len()
    }

    /// Publish a pool set for a pair. Returns `false` when the cached set is newer and the update was dropped.
    pub fn publish(&self, token_a: Address, token_b: Address, pool_set: PoolSet) -> bool {
        let block_number = pool_set.block_number;
        let accepted = match self.pairs.entry(TokenPairKey::new(token_a, token_b)) {
            Entry::Occupied(mut entry) => {
                if entry.get().block_number > block_number {
                    debug!("Outdated publish dropped token_a={:#} token_b={:#} block={} cached={}", token_a, token_b, block_number, entry.get().block_number);
                    false
                } else {
                    entry.insert(Arc::new(pool_set));
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(pool_set));
                true
            }
        };
        if accepted {
            self.last_update_height.fetch_max(block_number, Ordering::AcqRel);
        }
        accepted
    }

    /// Fetch a pair and publish the result.
    pub async fn refresh(&self, token_a: &Token, token_b: &Token) -> Result<Arc<PoolSet>> {
        let fetched = self.fetcher.fetch_pools(token_a, token_b).await?;
        self.tokens.entry(token_a.get_address()).or_insert_with(|| token_a.clone());
        self.tokens.entry(token_b.get_address()).or_insert_with(|| token_b.clone());
        self.publish(token_a.get_address(), token_b.get_address(), PoolSet::new(fetched.block_number, fetched.pools));
        Ok(self.get_pools(token_a.get_address(), token_b.get_address()))
    }

    /// Cached pools of a pair, fetching them first when the pair is unknown.
    pub async fn get_or_fetch(&self, token_a: &Token, token_b: &Token) -> Result<Arc<PoolSet>> {
        if let Some(entry) = self.pairs.get(&TokenPairKey::new(token_a.get_address(), token_b.get_address())) {
            return Ok(entry.value().clone());
        }
        self.refresh(token_a, token_b).await
    }

    /// Tokens relevant to a search: both ends, the base tokens and the native asset in both forms.
    pub fn search_tokens(&self, token_in: &Token, token_out: &Token) -> Vec<Token> {
        let mut tokens = vec![token_in.clone(), token_out.clone()];
        tokens.extend(self.base_tokens.iter().cloned());
        tokens.push(Token::native(self.chain_id));
        if let Some(wrapped) = wrapped_native(self.chain_id) {
            tokens.push(Token::new(self.chain_id, wrapped));
        }
        tokens.sort();
        tokens.dedup();
        tokens
    }

    /// Refresh every pair among the search tokens concurrently. Returns the number of refreshed pairs.
    /// Fails only when every refresh failed.
    pub async fn fetch_pools_for_tokens(self: &Arc<Self>, token_in: &Token, token_out: &Token) -> Result<usize> {
        let tokens = self.search_tokens(token_in, token_out);
        let mut tasks = JoinSet::new();
        for (i, token_a) in tokens.iter().enumerate() {
            for token_b in tokens.iter().skip(i + 1) {
                let registry = Arc::clone(self);
                let (token_a, token_b) = (token_a.clone(), token_b.clone());
                tasks.spawn(async move { registry.refresh(&token_a, &token_b).await.map(|_| ()) });
            }
        }

        let (mut refreshed, mut failed) = (0usize, 0usize);
        let mut last_error = None;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(())) => refreshed += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    last_error = Some(e);
                }
                Err(e) => {
                    failed += 1;
                    last_error = Some(eyre::eyre!("Refresh task failed: {}", e));
                }
            }
        }

        if refreshed == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        if failed > 0 {
            warn!("Pair refresh incomplete refreshed={} failed={}", refreshed, failed);
        }
        info!("Pools fetched token_in={:#} token_out={:#} pairs={}", token_in.get_address(), token_out.get_address(), refreshed);
        Ok(refreshed)
    }

    /// Snapshot of the cached pairs among the search tokens. The block number is the oldest pair's.
    pub fn snapshot_for_tokens(&self, token_in: &Token, token_out: &Token) -> RegistrySnapshot {
        let tokens = self.search_tokens(token_in, token_out);
        let mut sets = vec![];
        for (i, token_a) in tokens.iter().enumerate() {
            for token_b in tokens.iter().skip(i + 1) {
                if let Some(entry) = self.pairs.get(&TokenPairKey::new(token_a.get_address(), token_b.get_address())) {
                    sets.push(entry.value().clone());
                }
            }
        }
        Self::merge(sets)
    }

    /// Snapshot of every cached pair.
    pub fn snapshot_all(&self) -> RegistrySnapshot {
        Self::merge(self.pairs.iter().map(|entry| entry.value().clone()).collect())
    }

    fn merge(sets: Vec<Arc<PoolSet>>) -> RegistrySnapshot {
        let block_number = sets.iter().map(|set| set.block_number).min().unwrap_or_default();
        let mut pools = BTreeMap::new();
        for set in sets {
            for (pool_id, pool) in set.pools.iter() {
                pools.insert(*pool_id, pool.clone());
            }
        }
        RegistrySnapshot { block_number, pools }
    }

    /// `StaleData` when the cached pair lags `current_height` by more than `max_age` blocks or was never fetched.
    pub fn check_freshness(&self, token_a: Address, token_b: Address, current_height: u64, max_age: u64) -> Result<(), RouterError> {
        let snapshot_height = self.pairs.get(&TokenPairKey::new(token_a, token_b)).map(|entry| entry.block_number).unwrap_or_default();
        if current_height.saturating_sub(snapshot_height) > max_age {
            return Err(RouterError::StaleData { snapshot_height, current_height, max_age });
        }
        Ok(())
    }

    /// Pairs currently cached, with their tokens when known
    pub fn cached_pairs(&self) -> Vec<(Token, Token)> {
        let mut pairs: Vec<(Token, Token)> = self
            .pairs
            .iter()
            .filter_map(|entry| {
                let key = entry.key();
                let token_a = self.tokens.get(&key.token_a)?.clone();
                let token_b = self.tokens.get(&key.token_b)?.clone();
                Some((token_a, token_b))
            })
            .collect();
        pairs.sort();
        pairs
    }
}
