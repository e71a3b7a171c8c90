pub mod bridge;
pub mod constant_product;
pub mod pool;
pub mod pool_id;
pub mod rebase;
pub mod stable_swap;

pub use bridge::BridgePool;
pub use constant_product::ConstantProductPool;
pub use pool::{LiquidityProvider, Pool, PoolClass, PoolFilter, PoolWrapper, Quote};
pub use pool_id::PoolId;
pub use rebase::Rebase;
pub use stable_swap::{NewtonSolverConfig, StableSwapPool};
