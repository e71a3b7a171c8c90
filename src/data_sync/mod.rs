/// Data Synchronization Layer
///
/// Keeps a concurrent registry of pool state current and hands immutable snapshots to the route search:
///
/// - Pool data fetching behind the `PoolDataFetcher` trait
/// - Per pair pool sets published atomically at a block height
/// - Block driven refreshes with bounded concurrency
/// - Cross checks of snapshots against on-chain reads

pub mod block;
pub mod config;
pub mod fetcher;
pub mod registry;
pub mod service;
pub mod verification;


pub use block::BlockHeader;
pub use config::DataSyncConfig;
pub use fetcher::{FetchedPools, PoolDataFetcher, StaticPoolFetcher};
pub use registry::{PoolRegistry, PoolSet, RegistrySnapshot, TokenPairKey};
pub use service::{DataSyncService, DataSyncServiceBuilder, SyncStats, SyncStatsSnapshot};
pub use verification::{PoolMismatch, VerificationReport, VerificationTolerance, verify_pools_state};
