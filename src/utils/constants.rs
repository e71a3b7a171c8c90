use alloy_primitives::{Address, address};

/// Placeholder address used for the chain's native asset in routes and call parameters.
pub const NATIVE: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WMATIC: Address = address!("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");
pub const WMNT: Address = address!("0x78c1b0c915c4faa5fffa6cabf0219da63d7f4cb8");

#[non_exhaustive]
pub struct ChainId;

impl ChainId {
    pub const ETHEREUM: u64 = 1;
    pub const POLYGON: u64 = 137;
    pub const MANTLE: u64 = 5000;
}

/// Wrapped native token of a chain, if known.
pub fn wrapped_native(chain_id: u64) -> Option<Address> {
    match chain_id {
        ChainId::ETHEREUM => Some(WETH),
        ChainId::POLYGON => Some(WMATIC),
        ChainId::MANTLE => Some(WMNT),
        _ => None,
    }
}

pub fn native_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        ChainId::POLYGON => "MATIC",
        ChainId::MANTLE => "MNT",
        _ => "ETH",
    }
}

// Gas units charged per leg, by pool kind
pub const CONSTANT_PRODUCT_GAS: u64 = 40_000;
pub const STABLE_SWAP_GAS: u64 = 60_000;
pub const BRIDGE_UNBOUNDED_GAS: u64 = 30_000;
pub const BRIDGE_BOUNDED_GAS: u64 = 50_000;
