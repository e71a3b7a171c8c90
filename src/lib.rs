// Three-Layer Architecture
pub mod data_sync; // Data Layer: pool fetching, registry, snapshot verification
pub mod execution; // Execution Layer: route encoding for the route processor
pub mod logic; // Logic Layer: pool math, path finding, flow distribution

pub mod error;
// Common utilities and types
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{
    DataSyncConfig, DataSyncService, DataSyncServiceBuilder, PoolDataFetcher, PoolRegistry, RegistrySnapshot, StaticPoolFetcher,
    VerificationReport, VerificationTolerance, verify_pools_state,
};
pub use error::RouterError;
pub use execution::{CallParameters, EncodeOptions, decode_route_code, encode_route_params, encode_route_params_with};
pub use logic::{
    Leg, LiquidityProvider, Pool, PoolClass, PoolFilter, PoolId, PoolWrapper, Route, RouteRequest, RouteRetryPolicy, RouteStatus, Router,
    RouterBuilder, RouterConfig, find_route_with_retry,
};
pub use utils::Token;
