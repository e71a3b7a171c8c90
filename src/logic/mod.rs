/// Logic Layer - Route Search
///
/// This layer is responsible for:
/// - Pool pricing models
/// - Graph-based token and pool relationships and path enumeration
/// - Splitting an input amount over parallel paths
/// - The caller level retry loop around a search

pub mod distribution;
pub mod graph;
pub mod pools;
pub mod pricing;
pub mod retry;
pub mod router;
pub mod types;

// Re-export key components from the logic layer
pub use distribution::{Distribution, PoolFlow, SearchBudget, best_distribution, distribute};
pub use graph::{SwapPath, SwapPathHash, SwapPathSet, TokenGraph, find_all_paths};
pub use pools::{BridgePool, ConstantProductPool, LiquidityProvider, Pool, PoolClass, PoolFilter, PoolId, PoolWrapper, Quote, Rebase, StableSwapPool};
pub use pricing::TokenPrices;
pub use retry::{RouteRequest, RouteRetryPolicy, find_route_with_retry, wait_for_registry_height};
pub use router::{Router, RouterBuilder, pool_kind_filter};
pub use types::{Leg, Route, RouteStatus, RouterConfig};
