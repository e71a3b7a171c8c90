use super::pools::LiquidityProvider;
use super::router::Router;
use super::types::{Route, RouteStatus};
use crate::data_sync::{DataSyncConfig, PoolRegistry};
use crate::error::RouterError;
use crate::utils::Token;
use alloy_primitives::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Backoff schedule of [`find_route_with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Oldest snapshot, in blocks behind the fetcher's current block, a search may use
    pub max_snapshot_age: u64,
}

impl Default for RouteRetryPolicy {
    fn default() -> Self {
        Self::from_config(&DataSyncConfig::default())
    }
}

impl RouteRetryPolicy {
    pub fn from_config(config: &DataSyncConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            initial_backoff: config.retry_initial_backoff(),
            backoff_multiplier: config.retry_backoff_multiplier.max(1.0),
            max_snapshot_age: config.max_snapshot_age_blocks,
        }
    }

    /// Delay before retrying after `attempt` (0 based) failed
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff.mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }
}

#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub chain_id: u64,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    pub gas_price_wei: U256,
    pub providers: Option<Vec<LiquidityProvider>>,
}

impl RouteRequest {
    pub fn new(chain_id: u64, token_in: Token, amount_in: U256, token_out: Token) -> Self {
        Self { chain_id, token_in, token_out, amount_in, gas_price_wei: U256::ZERO, providers: None }
    }

    pub fn with_gas_price(mut self, gas_price_wei: U256) -> Self {
        self.gas_price_wei = gas_price_wei;
        self
    }

    pub fn with_providers(mut self, providers: Vec<LiquidityProvider>) -> Self {
        self.providers = Some(providers);
        self
    }
}

/// Refresh, search and back off until the search succeeds or the attempts run out.
///
/// Each attempt refreshes the pairs of the request, rejects a snapshot older than the policy allows and
/// runs a search. When no attempt succeeds the last `Partial` route is returned; otherwise the last failure
/// is: `NoRouteFound` for a search without a way, `StaleData` or `Fetch` for data problems.
pub async fn find_route_with_retry(router: &Router, registry: &Arc<PoolRegistry>, request: &RouteRequest, policy: &RouteRetryPolicy) -> Result<Route, RouterError> {
    let mut last_partial: Option<Route> = None;
    let mut last_error = RouterError::NoRouteFound { from: request.token_in.get_address(), to: request.token_out.get_address() };

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let backoff = policy.backoff(attempt - 1);
            debug!("Retrying route search attempt={} backoff={:?}", attempt, backoff);
            sleep(backoff).await;
        }

        match attempt_route(router, registry, request, policy).await {
            Ok(route) if route.status == RouteStatus::Success => {
                info!("Route found attempt={} amount_out={} legs={}", attempt, route.amount_out, route.legs.len());
                return Ok(route);
            }
            Ok(route) if route.status == RouteStatus::Partial => {
                debug!("Partial route attempt={} amount_in={}", attempt, route.amount_in);
                last_partial = Some(route);
            }
            Ok(_) => {
                last_error = RouterError::NoRouteFound { from: request.token_in.get_address(), to: request.token_out.get_address() };
            }
            Err(e) => {
                warn!("Route attempt failed attempt={} error={}", attempt, e);
                last_error = e;
            }
        }
    }

    match last_partial {
        Some(route) => Ok(route),
        None => Err(last_error),
    }
}

async fn attempt_route(router: &Router, registry: &Arc<PoolRegistry>, request: &RouteRequest, policy: &RouteRetryPolicy) -> Result<Route, RouterError> {
    let current_height = registry.fetcher().current_block().await?;
    registry.fetch_pools_for_tokens(&request.token_in, &request.token_out).await?;

    let snapshot = registry.snapshot_for_tokens(&request.token_in, &request.token_out);
    snapshot.ensure_fresh(current_height, policy.max_snapshot_age)?;

    Ok(router.find_best_route(
        &snapshot,
        request.chain_id,
        &request.token_in,
        request.amount_in,
        &request.token_out,
        request.gas_price_wei,
        request.providers.as_deref(),
        None,
    ))
}

/// Wait until the registry has published data from `height` or later.
pub async fn wait_for_registry_height(registry: &PoolRegistry, height: u64, timeout: Duration, poll_interval: Duration) -> Result<(), RouterError> {
    let deadline = Instant::now() + timeout;
    loop {
        let current = registry.last_update_height();
        if current >= height {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RouterError::StaleData { snapshot_height: current, current_height: height, max_age: 0 });
        }
        sleep(poll_interval).await;
    }
}
