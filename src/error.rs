use crate::logic::pools::PoolId;
use alloy_primitives::Address;

/// Failures surfaced by pricing, searching and encoding.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("No route found from {from} to {to}")]
    NoRouteFound { from: Address, to: Address },
    #[error("Quote unstable for pool {0}")]
    QuoteUnstable(PoolId),
    #[error("Capacity exceeded for pool {pool}: requested {requested}, available {available}")]
    CapacityExceeded { pool: PoolId, requested: f64, available: f64 },
    #[error("Stale data: snapshot block {snapshot_height}, current block {current_height}, max age {max_age}")]
    StaleData { snapshot_height: u64, current_height: u64, max_age: u64 },
    #[error("Encoding refused: {0}")]
    EncodingRefused(String),
    #[error("Fetch error: {0}")]
    Fetch(String),
}

impl From<eyre::Report> for RouterError {
    fn from(report: eyre::Report) -> Self {
        RouterError::Fetch(report.to_string())
    }
}
