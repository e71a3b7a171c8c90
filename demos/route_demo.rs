/// Route search walkthrough
///
/// Builds a registry over an in-memory fetcher, keeps it current with the data sync service, searches a
/// route and encodes it for the route processor. Pass a settings TOML path as the first argument to
/// override the defaults.
use alloy_primitives::{Address, U256, address};
use eyre::Result;
use std::sync::Arc;
use swap_route::data_sync::{BlockHeader, DataSyncService, PoolRegistry, StaticPoolFetcher, verify_pools_state};
use swap_route::logic::pools::{BridgePool, ConstantProductPool, Rebase, StableSwapPool};
use swap_route::utils::constants::{ChainId, WETH};
use swap_route::utils::{RouteConfigLoaderSync, RouterSettings};
use swap_route::{PoolWrapper, RouteRequest, RouteRetryPolicy, Router, Token, encode_route_params, find_route_with_retry};
use tracing::{info, warn};

const ROUTE_PROCESSOR: Address = address!("0x827179dD56d07A7eeA32e3873493835da2866976");

fn demo_pools(native: &Token, weth: &Token, usdc: &Token, usdt: &Token) -> Vec<PoolWrapper> {
    let eth = U256::from(10u64).pow(U256::from(18u64));
    let usd = U256::from(1_000_000u64);
    vec![
        BridgePool::unbounded(address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), native.clone(), weth.clone()).into(),
        ConstantProductPool::new(Address::repeat_byte(0x11), weth.clone(), usdc.clone(), eth * U256::from(2_000u64), usd * U256::from(4_000_000u64), 0.003)
            .into(),
        ConstantProductPool::new(Address::repeat_byte(0x12), weth.clone(), usdt.clone(), eth * U256::from(500u64), usd * U256::from(1_000_000u64), 0.003)
            .into(),
        StableSwapPool::new(
            Address::repeat_byte(0x13),
            usdc.clone(),
            usdt.clone(),
            usd * U256::from(10_000_000u64),
            usd * U256::from(10_000_000u64),
            Rebase::default(),
            Rebase::default(),
            200,
            0.0001,
        )
        .into(),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let settings = match std::env::args().nth(1) {
        Some(path) => RouterSettings::load_section_from_file_sync(path)?,
        None => RouterSettings::default(),
    };

    let chain_id = ChainId::ETHEREUM;
    let native = Token::native(chain_id);
    let weth = Token::new_with_data(chain_id, WETH, Some("WETH".to_string()), Some(18));
    let usdc = Token::new_with_data(chain_id, address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"), Some("USDC".to_string()), Some(6));
    let usdt = Token::new_with_data(chain_id, address!("0xdac17f958d2ee523a2206206994597c13d831ec7"), Some("USDT".to_string()), Some(6));

    let fetcher = Arc::new(StaticPoolFetcher::new(18_000_000, demo_pools(&native, &weth, &usdc, &usdt)));
    let registry = Arc::new(PoolRegistry::new(fetcher.clone(), chain_id).with_base_tokens(vec![weth.clone(), usdc.clone()]));

    let mut service = DataSyncService::new(settings.data_sync.clone(), registry.clone());
    service.watch_search(&native, &usdt);
    service.start()?;
    service.block_sender().send(BlockHeader::new(18_000_000, 1_700_000_000)).await?;

    let router = Router::new(settings.router.clone());
    let request = RouteRequest::new(chain_id, native.clone(), U256::from(10u64).pow(U256::from(19u64)), usdt.clone())
        .with_gas_price(U256::from(30_000_000_000u64));
    let route = find_route_with_retry(&router, &registry, &request, &RouteRetryPolicy::from_config(&settings.data_sync)).await?;

    info!("Route status={} amount_out={} gas={} price_impact={:.5}", route.status, route.amount_out, route.gas_spent, route.price_impact);
    for leg in route.legs.iter() {
        info!(
            "  {} -> {} via {:#} ({}) portion={:.3} in={:.0} out={:.0}",
            leg.token_from.get_symbol(),
            leg.token_to.get_symbol(),
            leg.pool_address,
            leg.pool_class,
            leg.absolute_portion,
            leg.assumed_amount_in,
            leg.assumed_amount_out
        );
    }

    let snapshot = registry.snapshot_for_tokens(&native, &usdt);
    let report = verify_pools_state(&snapshot, fetcher.as_ref(), &settings.verification).await;
    if !report.is_consistent() {
        warn!("Snapshot drifted from chain state: {:?}", report.mismatches);
    }

    let params = encode_route_params(&snapshot, &route, &native, &usdt, Address::repeat_byte(0x42), ROUTE_PROCESSOR, 50)?;
    info!("amount_out_min={} value={} route_code=0x{}", params.amount_out_min, params.value, alloy_primitives::hex::encode(&params.route_code));
    info!("calldata bytes={}", params.process_route_calldata().len());

    service.stop().await?;
    Ok(())
}
