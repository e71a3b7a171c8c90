use super::route_processor::CallParameters;
use crate::data_sync::RegistrySnapshot;
use crate::error::RouterError;
use crate::logic::pools::PoolClass;
use crate::logic::types::{Leg, Route, RouteStatus};
use crate::utils::Token;
use crate::utils::amounts::f64_to_u256;
use crate::utils::constants::NATIVE;
use alloy_primitives::{Address, Bytes, U256};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::debug;

const SHARE_FULL: u16 = u16::MAX;
const BPS_DENOMINATOR: u64 = 10_000;
const LEG_SIZE: usize = 2 + 1 + 20 + 20 + 20 + 32 + 20;

/// First byte of a token block of the route code.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteCommand {
    /// Intermediate token already held by the route processor
    ProcessMyErc20 = 1,
    /// Input token pulled from the caller
    ProcessUserErc20 = 2,
    /// Native input sent as call value. The block carries no token field.
    ProcessNative = 3,
}

impl RouteCommand {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(RouteCommand::ProcessMyErc20),
            2 => Some(RouteCommand::ProcessUserErc20),
            3 => Some(RouteCommand::ProcessNative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub max_slippage_bps: u64,
    /// Encode a `Partial` route for its placed amount instead of refusing it
    pub accept_partial: bool,
}

impl EncodeOptions {
    pub fn new(max_slippage_bps: u64) -> Self {
        Self { max_slippage_bps, accept_partial: false }
    }

    pub fn accept_partial(mut self) -> Self {
        self.accept_partial = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLeg {
    pub share: u16,
    pub pool_class: PoolClass,
    pub pool: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub recipient: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTokenBlock {
    pub command: RouteCommand,
    /// `NATIVE` for a `ProcessNative` block
    pub token: Address,
    pub legs: Vec<DecodedLeg>,
}

/// Build the call parameters of a successful route.
pub fn encode_route_params(
    snapshot: &RegistrySnapshot,
    route: &Route,
    token_in: &Token,
    token_out: &Token,
    to: Address,
    route_processor: Address,
    max_slippage_bps: u64,
) -> Result<CallParameters, RouterError> {
    encode_route_params_with(snapshot, route, token_in, token_out, to, route_processor, &EncodeOptions::new(max_slippage_bps))
}

pub fn encode_route_params_with(
    snapshot: &RegistrySnapshot,
    route: &Route,
    token_in: &Token,
    token_out: &Token,
    to: Address,
    route_processor: Address,
    options: &EncodeOptions,
) -> Result<CallParameters, RouterError> {
    match route.status {
        RouteStatus::NoWay => return Err(RouterError::EncodingRefused("no route".to_string())),
        RouteStatus::Partial if !options.accept_partial => return Err(RouterError::EncodingRefused("partial route".to_string())),
        _ => {}
    }
    if route.legs.is_empty() && !route.amount_in_wei.is_zero() {
        return Err(RouterError::EncodingRefused("route has no legs".to_string()));
    }
    if route.from_token != *token_in || route.to_token != *token_out {
        return Err(RouterError::EncodingRefused(format!(
            "route swaps {:#} to {:#}, requested {:#} to {:#}",
            route.from_token.get_address(),
            route.to_token.get_address(),
            token_in.get_address(),
            token_out.get_address()
        )));
    }
    if options.max_slippage_bps > BPS_DENOMINATOR {
        return Err(RouterError::EncodingRefused(format!("slippage {} bps above 100%", options.max_slippage_bps)));
    }
    for leg in route.legs.iter() {
        if snapshot.get_pool(&leg.pool_id).is_none() {
            return Err(RouterError::EncodingRefused(format!("pool {} is not in the snapshot", leg.pool_id)));
        }
    }

    let route_code = encode_route_code(route, token_in, token_out, to, route_processor)?;
    let amount_out_min = route.amount_out_wei * U256::from(BPS_DENOMINATOR - options.max_slippage_bps) / U256::from(BPS_DENOMINATOR);
    let value = if token_in.is_native() { route.amount_in_wei } else { U256::ZERO };

    debug!("Route encoded legs={} code_len={} amount_out_min={}", route.legs.len(), route_code.len(), amount_out_min);
    Ok(CallParameters {
        token_in: token_in.get_address(),
        amount_in: route.amount_in_wei,
        token_out: token_out.get_address(),
        amount_out_min,
        to,
        route_code,
        value,
    })
}

/// Share of the remaining balance sent into a leg. Only the last leg of a block may take the whole
/// balance, and no earlier leg may round down to nothing.
fn share_of(leg: &Leg, is_last: bool) -> u16 {
    if is_last {
        return SHARE_FULL;
    }
    let share = (leg.swap_portion.clamp(0.0, 1.0) * SHARE_FULL as f64).round() as u16;
    share.clamp(1, SHARE_FULL - 1)
}

/// Token blocks in the order their first leg appears. Legs arrive in execution order, so every block
/// follows the blocks producing its token.
fn token_blocks(legs: &[Leg]) -> Vec<(&Token, Vec<&Leg>)> {
    let mut blocks: Vec<(&Token, Vec<&Leg>)> = vec![];
    for leg in legs {
        match blocks.iter_mut().find(|(token, _)| **token == leg.token_from) {
            Some((_, block)) => block.push(leg),
            None => blocks.push((&leg.token_from, vec![leg])),
        }
    }
    blocks
}

fn encode_route_code(route: &Route, token_in: &Token, token_out: &Token, to: Address, route_processor: Address) -> Result<Bytes, RouterError> {
    let mut code = Vec::with_capacity(route.legs.len() * (LEG_SIZE + 22));

    for (token, legs) in token_blocks(&route.legs) {
        if legs.len() > u8::MAX as usize {
            return Err(RouterError::EncodingRefused(format!("{} legs from token {:#}", legs.len(), token.get_address())));
        }

        if token == token_in {
            if token.is_native() {
                code.push(RouteCommand::ProcessNative as u8);
            } else {
                code.push(RouteCommand::ProcessUserErc20 as u8);
                code.extend_from_slice(token.get_address().as_slice());
            }
        } else {
            code.push(RouteCommand::ProcessMyErc20 as u8);
            code.extend_from_slice(token.get_address().as_slice());
        }
        code.push(legs.len() as u8);

        let last = legs.len() - 1;
        for (i, leg) in legs.iter().enumerate() {
            let recipient = if leg.token_to == *token_out { to } else { route_processor };
            code.extend_from_slice(&share_of(leg, i == last).to_be_bytes());
            code.push(leg.pool_class.wire_tag());
            code.extend_from_slice(leg.pool_address.as_slice());
            code.extend_from_slice(leg.token_from.get_address().as_slice());
            code.extend_from_slice(leg.token_to.get_address().as_slice());
            code.extend_from_slice(&f64_to_u256(leg.assumed_amount_in).to_be_bytes::<32>());
            code.extend_from_slice(recipient.as_slice());
        }
    }

    Ok(code.into())
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset + len;
        if end > self.data.len() {
            return Err(eyre!("Route code truncated at byte {}", self.offset));
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn address(&mut self) -> Result<Address> {
        Ok(Address::from_slice(self.take(20)?))
    }
}

/// Parse a route code back into token blocks.
pub fn decode_route_code(code: &[u8]) -> Result<Vec<DecodedTokenBlock>> {
    let mut reader = Reader { data: code, offset: 0 };
    let mut blocks = vec![];

    while reader.offset < code.len() {
        let command_byte = reader.u8()?;
        let command = RouteCommand::from_byte(command_byte).ok_or_else(|| eyre!("Unknown route command {}", command_byte))?;
        let token = match command {
            RouteCommand::ProcessNative => NATIVE,
            _ => reader.address()?,
        };
        let count = reader.u8()?;

        let mut legs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let share = reader.take(2)?;
            let share = u16::from_be_bytes([share[0], share[1]]);
            let tag = reader.u8()?;
            let pool_class = PoolClass::from_wire_tag(tag).ok_or_else(|| eyre!("Unknown pool type {}", tag))?;
            let pool = reader.address()?;
            let token_in = reader.address()?;
            let token_out = reader.address()?;
            let amount_in = U256::from_be_slice(reader.take(32)?);
            let recipient = reader.address()?;
            legs.push(DecodedLeg { share, pool_class, pool, token_in, token_out, amount_in, recipient });
        }
        blocks.push(DecodedTokenBlock { command, token, legs });
    }

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::pools::{BridgePool, ConstantProductPool, LiquidityProvider, PoolId, PoolWrapper};
    use crate::logic::{Router, RouterConfig};
    use crate::utils::constants::{ChainId, WETH};

    const TO: Address = Address::new([0x77; 20]);
    const PROCESSOR: Address = Address::new([0x88; 20]);

    fn cp(token0: &Token, token1: &Token, address: u8, reserve0: u64, reserve1: u64) -> PoolWrapper {
        PoolWrapper::from(ConstantProductPool::new(
            Address::repeat_byte(address),
            token0.clone(),
            token1.clone(),
            U256::from(reserve0),
            U256::from(reserve1),
            0.003,
        ))
    }

    fn search(pools: Vec<PoolWrapper>, token_in: &Token, amount_in: u64, token_out: &Token) -> (RegistrySnapshot, Route) {
        let snapshot = RegistrySnapshot::from_pools(1, pools);
        let route = Router::new(RouterConfig::default()).find_best_route(
            &snapshot,
            ChainId::ETHEREUM,
            token_in,
            U256::from(amount_in),
            token_out,
            U256::ZERO,
            None,
            None,
        );
        (snapshot, route)
    }

    #[test]
    fn test_single_leg_layout() -> eyre::Result<()> {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let (snapshot, route) = search(vec![cp(&token_a, &token_b, 10, 1_000_000, 2_000_000)], &token_a, 1000, &token_b);
        assert_eq!(route.status, RouteStatus::Success);

        let params = encode_route_params(&snapshot, &route, &token_a, &token_b, TO, PROCESSOR, 50)?;
        assert_eq!(params.value, U256::ZERO);
        assert_eq!(params.amount_in, U256::from(1000u64));
        assert_eq!(params.amount_out_min, route.amount_out_wei * U256::from(9950u64) / U256::from(10_000u64));

        let code = params.route_code.as_ref();
        assert_eq!(code.len(), 1 + 20 + 1 + LEG_SIZE);
        assert_eq!(code[0], RouteCommand::ProcessUserErc20 as u8);
        assert_eq!(&code[1..21], token_a.get_address().as_slice());
        assert_eq!(code[21], 1);
        assert_eq!(&code[22..24], &[0xff, 0xff]);
        assert_eq!(code[24], PoolClass::ConstantProduct.wire_tag());
        assert_eq!(&code[25..45], Address::repeat_byte(10).as_slice());
        assert_eq!(&code[code.len() - 20..], TO.as_slice());
        Ok(())
    }

    #[test]
    fn test_split_and_multi_hop_round_trip() -> eyre::Result<()> {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let usdc = Token::repeat_byte(3);
        let pools = vec![
            cp(&token_a, &token_b, 10, 1_000_000, 1_000_000),
            cp(&token_a, &usdc, 11, 1_000_000, 1_000_000),
            cp(&usdc, &token_b, 12, 1_000_000, 1_000_000),
        ];
        let (snapshot, route) = search(pools, &token_a, 200_000, &token_b);
        assert_eq!(route.status, RouteStatus::Success);
        assert_eq!(route.legs.len(), 3);

        let params = encode_route_params(&snapshot, &route, &token_a, &token_b, TO, PROCESSOR, 100)?;
        let blocks = decode_route_code(&params.route_code)?;
        assert_eq!(blocks.len(), 2);

        let first = &blocks[0];
        assert_eq!(first.command, RouteCommand::ProcessUserErc20);
        assert_eq!(first.token, token_a.get_address());
        assert_eq!(first.legs.len(), 2);
        assert!(first.legs[0].share < SHARE_FULL);
        assert_eq!(first.legs[1].share, SHARE_FULL);

        let second = &blocks[1];
        assert_eq!(second.command, RouteCommand::ProcessMyErc20);
        assert_eq!(second.token, usdc.get_address());
        assert_eq!(second.legs.len(), 1);
        assert_eq!(second.legs[0].recipient, TO);

        for block in blocks.iter() {
            for leg in block.legs.iter() {
                let expected = if leg.token_out == token_b.get_address() { TO } else { PROCESSOR };
                assert_eq!(leg.recipient, expected);
            }
        }

        let encoded: Vec<&Leg> = route.legs.iter().collect();
        let decoded: Vec<&DecodedLeg> = blocks.iter().flat_map(|block| block.legs.iter()).collect();
        for (leg, decoded) in encoded.iter().zip(decoded.iter()) {
            assert_eq!(decoded.pool, leg.pool_address);
            assert_eq!(decoded.token_in, leg.token_from.get_address());
            assert_eq!(decoded.token_out, leg.token_to.get_address());
            assert_eq!(decoded.amount_in, f64_to_u256(leg.assumed_amount_in));
        }
        Ok(())
    }

    #[test]
    fn test_dominant_leg_leaves_balance_for_next() -> eyre::Result<()> {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let bridge = BridgePool::bounded(Address::repeat_byte(11), token_a.clone(), token_b.clone(), U256::from(3u64));
        let pools = vec![cp(&token_a, &token_b, 10, 1_000_000_000_000, 1_000_000_000_000), bridge.into()];
        let (snapshot, route) = search(pools, &token_a, 1_000_000, &token_b);
        assert_eq!(route.status, RouteStatus::Success);
        assert_eq!(route.legs.len(), 2);

        let params = encode_route_params(&snapshot, &route, &token_a, &token_b, TO, PROCESSOR, 50)?;
        let blocks = decode_route_code(&params.route_code)?;
        assert_eq!(blocks.len(), 1);
        let shares: Vec<u16> = blocks[0].legs.iter().map(|leg| leg.share).collect();
        assert_eq!(shares.len(), 2);
        assert!((1..SHARE_FULL).contains(&shares[0]));
        assert_eq!(shares[1], SHARE_FULL);
        Ok(())
    }

    #[test]
    fn test_tiny_leg_keeps_nonzero_share() {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let leg = |address: u8, portion: f64| Leg {
            pool_id: PoolId::Address(Address::repeat_byte(address)),
            pool_address: Address::repeat_byte(address),
            pool_class: PoolClass::ConstantProduct,
            provider: LiquidityProvider::SushiSwap,
            token_from: token_a.clone(),
            token_to: token_b.clone(),
            assumed_amount_in: 1.0,
            assumed_amount_out: 1.0,
            swap_portion: portion,
            absolute_portion: portion,
            capacity_exceeded: false,
        };

        assert_eq!(share_of(&leg(10, 1e-9), false), 1);
        assert_eq!(share_of(&leg(10, 0.999_999_9), false), SHARE_FULL - 1);
        assert_eq!(share_of(&leg(10, 0.5), false), 32768);
        assert_eq!(share_of(&leg(11, 1e-9), true), SHARE_FULL);
    }

    #[test]
    fn test_native_input() -> eyre::Result<()> {
        let native = Token::native(ChainId::ETHEREUM);
        let weth = Token::new(ChainId::ETHEREUM, WETH);
        let token_b = Token::repeat_byte(2);
        let wrap = BridgePool::unbounded(Address::repeat_byte(20), native.clone(), weth.clone());
        let pools = vec![wrap.into(), cp(&weth, &token_b, 10, 1_000_000, 1_000_000)];
        let (snapshot, route) = search(pools, &native, 1000, &token_b);
        assert_eq!(route.status, RouteStatus::Success);

        let params = encode_route_params(&snapshot, &route, &native, &token_b, TO, PROCESSOR, 0)?;
        assert_eq!(params.value, params.amount_in);
        assert_eq!(params.token_in, NATIVE);
        assert!(!params.token_in.is_zero());
        assert_eq!(params.amount_out_min, route.amount_out_wei);

        let blocks = decode_route_code(&params.route_code)?;
        assert_eq!(blocks[0].command, RouteCommand::ProcessNative);
        assert_eq!(blocks[0].token, NATIVE);
        assert_eq!(blocks[0].legs[0].pool_class, PoolClass::BridgeUnbounded);
        assert_eq!(blocks[0].legs[0].recipient, PROCESSOR);
        // the native block has no token field
        assert_eq!(params.route_code[1], 1);
        Ok(())
    }

    #[test]
    fn test_refusals() {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let token_c = Token::repeat_byte(3);

        let (snapshot, no_way) = search(vec![cp(&token_a, &token_c, 10, 1000, 1000)], &token_a, 100, &token_b);
        assert_eq!(no_way.status, RouteStatus::NoWay);
        assert!(matches!(encode_route_params(&snapshot, &no_way, &token_a, &token_b, TO, PROCESSOR, 50), Err(RouterError::EncodingRefused(_))));

        let bridge = BridgePool::bounded(Address::repeat_byte(11), token_a.clone(), token_b.clone(), U256::from(50u64));
        let (snapshot, partial) = search(vec![bridge.into()], &token_a, 100, &token_b);
        assert_eq!(partial.status, RouteStatus::Partial);
        assert!(matches!(encode_route_params(&snapshot, &partial, &token_a, &token_b, TO, PROCESSOR, 50), Err(RouterError::EncodingRefused(_))));
        let accepted = encode_route_params_with(&snapshot, &partial, &token_a, &token_b, TO, PROCESSOR, &EncodeOptions::new(50).accept_partial());
        assert_eq!(accepted.map(|params| params.amount_in), Ok(U256::from(50u64)));

        let (snapshot, route) = search(vec![cp(&token_a, &token_b, 10, 1_000_000, 1_000_000)], &token_a, 100, &token_b);
        assert!(matches!(encode_route_params(&snapshot, &route, &token_a, &token_b, TO, PROCESSOR, 10_001), Err(RouterError::EncodingRefused(_))));
        assert!(matches!(encode_route_params(&snapshot, &route, &token_b, &token_a, TO, PROCESSOR, 50), Err(RouterError::EncodingRefused(_))));
        let empty = RegistrySnapshot::default();
        assert!(matches!(encode_route_params(&empty, &route, &token_a, &token_b, TO, PROCESSOR, 50), Err(RouterError::EncodingRefused(_))));
    }

    #[test]
    fn test_empty_routes() -> eyre::Result<()> {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let snapshot = RegistrySnapshot::default();

        let params = encode_route_params(&snapshot, &Route::zero(token_a.clone(), token_b.clone()), &token_a, &token_b, TO, PROCESSOR, 50)?;
        assert!(params.route_code.is_empty());
        assert_eq!(params.amount_out_min, U256::ZERO);

        let identity = Route::identity(token_a.clone(), 1000.0);
        assert!(encode_route_params(&snapshot, &identity, &token_a, &token_a, TO, PROCESSOR, 50).is_err());
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_route_code(&[]).is_ok_and(|blocks| blocks.is_empty()));
        assert!(decode_route_code(&[9]).is_err());
        assert!(decode_route_code(&[2, 1, 2, 3]).is_err());
        let mut code = vec![3u8, 1];
        code.extend_from_slice(&[0xff, 0xff, 7]);
        code.extend_from_slice(&[0u8; LEG_SIZE - 3]);
        assert!(decode_route_code(&code).is_err());
    }
}
