use crate::logic::pools::{PoolId, PoolWrapper};
use crate::utils::Token;
use ahash::RandomState;
use alloy_primitives::Address;
use eyre::eyre;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;

pub type FastHasher = RandomState;
/// FastHashMap using ahash
pub type FastHashMap<K, V> = HashMap<K, V, FastHasher>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenGraph {
    // Nodes are tokens, an edge holds every pool between its two tokens ordered by pool id.
    // Built fresh for each search so nodes and edges are never removed.
    pub graph: UnGraph<TokenNode, BTreeMap<PoolId, PoolEdge>, usize>,
    // pool id -> pool
    pub pools: BTreeMap<PoolId, PoolWrapper>,
    // token -> node index
    pub token_index: FastHashMap<Address, NodeIndex<usize>>,
    // pool -> edge index
    pub pool_index: FastHashMap<PoolId, EdgeIndex<usize>>,
}

impl TokenGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            pools: BTreeMap::new(),
            token_index: FastHashMap::default(),
            pool_index: FastHashMap::default(),
        }
    }

    /// Graph over the given pools. Insertion follows the iterator, so a sorted input gives a reproducible graph.
    pub fn from_pools<'a>(pools: impl IntoIterator<Item = &'a PoolWrapper>) -> eyre::Result<Self> {
        let mut token_graph = TokenGraph::new();
        for pool in pools {
            token_graph.add_pool(pool.clone())?;
        }
        Ok(token_graph)
    }

    pub fn set_pool_active(&mut self, pool_id: PoolId, is_active: bool) -> eyre::Result<()> {
        if let Some(edge_index) = self.pool_index.get(&pool_id) {
            let Some(edge) = self.graph.edge_weight_mut(*edge_index) else {
                return Err(eyre!("Edge not found in graph: {:?}", pool_id));
            };
            let Some(pool) = edge.get_mut(&pool_id) else {
                return Err(eyre!("Pool not found in edge: {:?}", pool_id));
            };
            pool.is_active = is_active;
        } else {
            return Err(eyre!("Pool not found in graph: {:?}", pool_id));
        }
        Ok(())
    }

    pub fn add_or_get_token_idx_by_token(&mut self, arc_token: Arc<Token>) -> NodeIndex<usize> {
        *self.token_index.entry(arc_token.get_address()).or_insert_with(|| {
            let node = TokenNode::new(arc_token.clone());
            self.graph.add_node(node)
        })
    }

    // Add a new pool as an edge to the graph. Missing tokens are added as nodes.
    pub fn add_pool<T: Into<PoolWrapper>>(&mut self, pool: T) -> eyre::Result<()> {
        let pool_wrapper = pool.into();
        let pool_id = pool_wrapper.get_pool_id();
        if pool_wrapper.token0().get_chain_id() != pool_wrapper.token1().get_chain_id() {
            return Err(eyre!("Pool tokens live on different chains: {:?}", pool_id));
        }

        let node_a = self.add_or_get_token_idx_by_token(Arc::new(pool_wrapper.token0().clone()));
        let node_b = self.add_or_get_token_idx_by_token(Arc::new(pool_wrapper.token1().clone()));
        if node_a == node_b {
            return Err(eyre!("Pool connects a token with itself: {:?}", pool_id));
        }

        let pool_edge = PoolEdge::new(pool_wrapper.clone());
        if let Some(edge_index) = self.graph.find_edge(node_a, node_b) {
            let Some(pools) = self.graph.edge_weight_mut(edge_index) else {
                return Err(eyre!("Edge not found in graph: {:?}", pool_id));
            };
            pools.insert(pool_id, pool_edge);
            self.pool_index.insert(pool_id, edge_index);
        } else {
            let mut pools = BTreeMap::new();
            pools.insert(pool_id, pool_edge);
            let edge_index = self.graph.add_edge(node_a, node_b, pools);
            self.pool_index.insert(pool_id, edge_index);
        }

        self.pools.insert(pool_id, pool_wrapper);

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenNode {
    pub token: Arc<Token>,
}

impl Display for TokenNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.token.get_address())
    }
}

impl TokenNode {
    pub fn new(token: Arc<Token>) -> Self {
        Self { token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolEdge {
    pub is_active: bool,
    pub inner: PoolWrapper,
}

impl Display for PoolEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner.get_address())
    }
}

impl PoolEdge {
    pub fn new(pool_wrapper: PoolWrapper) -> Self {
        Self { is_active: true, inner: pool_wrapper }
    }
}
