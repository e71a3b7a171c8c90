use super::bridge::BridgePool;
use super::constant_product::ConstantProductPool;
use super::pool_id::PoolId;
use super::stable_swap::StableSwapPool;
use crate::error::RouterError;
use crate::utils::Token;
use crate::utils::constants::{BRIDGE_BOUNDED_GAS, BRIDGE_UNBOUNDED_GAS, CONSTANT_PRODUCT_GAS, STABLE_SWAP_GAS};
use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// Pricing curve of a pool. The discriminant is the pool type byte of the encoded route.
#[derive(Copy, Clone, Debug, Display, PartialEq, Hash, Eq, EnumString, VariantNames, Default, Deserialize, Serialize, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolClass {
    #[default]
    ConstantProduct = 0,
    StableSwap = 1,
    BridgeUnbounded = 2,
    BridgeBounded = 3,
}

impl PoolClass {
    pub fn wire_tag(&self) -> u8 {
        *self as u8
    }

    pub fn from_wire_tag(tag: u8) -> Option<PoolClass> {
        match tag {
            0 => Some(PoolClass::ConstantProduct),
            1 => Some(PoolClass::StableSwap),
            2 => Some(PoolClass::BridgeUnbounded),
            3 => Some(PoolClass::BridgeBounded),
            _ => None,
        }
    }

    pub fn gas_spent(&self) -> u64 {
        match self {
            PoolClass::ConstantProduct => CONSTANT_PRODUCT_GAS,
            PoolClass::StableSwap => STABLE_SWAP_GAS,
            PoolClass::BridgeUnbounded => BRIDGE_UNBOUNDED_GAS,
            PoolClass::BridgeBounded => BRIDGE_BOUNDED_GAS,
        }
    }
}

/// Family of contracts a pool belongs to, used for provider-restricted routing.
#[derive(Copy, Clone, Debug, Display, PartialEq, Hash, Eq, PartialOrd, Ord, EnumString, VariantNames, Default, Deserialize, Serialize, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquidityProvider {
    #[default]
    Unknown,
    SushiSwap,
    UniswapV2,
    Trident,
    Curve,
    NativeWrap,
    BentoBridge,
}

/// Output of a pool for a given input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quote {
    pub amount_out: f64,
    /// The pool could not deliver the full amount and the output was capped.
    pub capacity_exceeded: bool,
}

impl Quote {
    pub fn new(amount_out: f64) -> Self {
        Self { amount_out, capacity_exceeded: false }
    }
}

/// Caller supplied predicate restricting which pools a search may use.
pub type PoolFilter = dyn Fn(&Pool) -> bool + Send + Sync;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pool {
    ConstantProduct(ConstantProductPool),
    StableSwap(StableSwapPool),
    Bridge(BridgePool),
}

impl Pool {
    pub fn get_class(&self) -> PoolClass {
        match self {
            Pool::ConstantProduct(_) => PoolClass::ConstantProduct,
            Pool::StableSwap(_) => PoolClass::StableSwap,
            Pool::Bridge(bridge) if bridge.capacity.is_some() => PoolClass::BridgeBounded,
            Pool::Bridge(_) => PoolClass::BridgeUnbounded,
        }
    }

    pub fn get_provider(&self) -> LiquidityProvider {
        match self {
            Pool::ConstantProduct(pool) => pool.provider,
            Pool::StableSwap(pool) => pool.provider,
            Pool::Bridge(pool) => pool.provider,
        }
    }

    pub fn get_address(&self) -> Address {
        match self {
            Pool::ConstantProduct(pool) => pool.address,
            Pool::StableSwap(pool) => pool.address,
            Pool::Bridge(pool) => pool.address,
        }
    }

    pub fn get_pool_id(&self) -> PoolId {
        PoolId::Address(self.get_address())
    }

    pub fn get_fee(&self) -> f64 {
        match self {
            Pool::ConstantProduct(pool) => pool.fee,
            Pool::StableSwap(pool) => pool.fee,
            Pool::Bridge(pool) => pool.fee,
        }
    }

    pub fn token0(&self) -> &Token {
        match self {
            Pool::ConstantProduct(pool) => &pool.token0,
            Pool::StableSwap(pool) => &pool.token0,
            Pool::Bridge(pool) => &pool.token0,
        }
    }

    pub fn token1(&self) -> &Token {
        match self {
            Pool::ConstantProduct(pool) => &pool.token1,
            Pool::StableSwap(pool) => &pool.token1,
            Pool::Bridge(pool) => &pool.token1,
        }
    }

    pub fn get_tokens(&self) -> Vec<Address> {
        vec![self.token0().get_address(), self.token1().get_address()]
    }

    pub fn get_swap_directions(&self) -> Vec<(Address, Address)> {
        let (token0, token1) = (self.token0().get_address(), self.token1().get_address());
        vec![(token0, token1), (token1, token0)]
    }

    pub fn connects(&self, token_a: Address, token_b: Address) -> bool {
        self.direction(token_a).is_some() && self.direction(token_b).is_some() && token_a != token_b
    }

    /// `Some(true)` when `token_in` is token0, `Some(false)` when it is token1.
    fn direction(&self, token_in: Address) -> Option<bool> {
        if token_in == self.token0().get_address() {
            Some(true)
        } else if token_in == self.token1().get_address() {
            Some(false)
        } else {
            None
        }
    }

    pub fn token_out(&self, token_in: Address) -> Option<&Token> {
        match self.direction(token_in)? {
            true => Some(self.token1()),
            false => Some(self.token0()),
        }
    }

    /// Amount of `token_out` received for `amount_in` raw units of `token_in`.
    /// A token the pool does not hold quotes zero.
    pub fn quote_output(&self, token_in: Address, amount_in: f64) -> Result<Quote, RouterError> {
        let Some(zero_for_one) = self.direction(token_in) else {
            return Ok(Quote::default());
        };
        match self {
            Pool::ConstantProduct(pool) => Ok(pool.quote(zero_for_one, amount_in)),
            Pool::StableSwap(pool) => pool.quote(zero_for_one, amount_in),
            Pool::Bridge(pool) => Ok(pool.quote(amount_in)),
        }
    }

    /// Output per unit of input for an infinitesimal trade.
    pub fn marginal_rate(&self, token_in: Address) -> Result<f64, RouterError> {
        let Some(zero_for_one) = self.direction(token_in) else {
            return Ok(0.0);
        };
        match self {
            Pool::ConstantProduct(pool) => Ok(pool.marginal_rate(zero_for_one)),
            Pool::StableSwap(pool) => pool.marginal_rate(zero_for_one),
            Pool::Bridge(pool) => Ok(pool.marginal_rate()),
        }
    }

    /// Relative shortfall of the executed rate against the marginal rate, in [0, 1].
    pub fn price_impact_at(&self, token_in: Address, amount_in: f64) -> Result<f64, RouterError> {
        if amount_in <= 0.0 {
            return Ok(0.0);
        }
        let marginal = self.marginal_rate(token_in)?;
        if marginal <= 0.0 {
            return Ok(0.0);
        }
        let executed = self.quote_output(token_in, amount_in)?.amount_out / amount_in;
        Ok((1.0 - executed / marginal).clamp(0.0, 1.0))
    }

    /// Real amount of `token` the pool can pay out.
    pub fn liquidity(&self, token: Address) -> f64 {
        let Some(zero) = self.direction(token) else {
            return 0.0;
        };
        match self {
            Pool::ConstantProduct(pool) => pool.liquidity(zero),
            Pool::StableSwap(pool) => pool.elastic_reserve(zero),
            Pool::Bridge(pool) => pool.liquidity(),
        }
    }

    /// Output cap of a bounded bridge.
    pub fn capacity(&self) -> Option<f64> {
        match self {
            Pool::Bridge(pool) => pool.capacity_f64(),
            _ => None,
        }
    }

    pub fn gas_spent(&self) -> u64 {
        self.get_class().gas_spent()
    }

    /// Pools that cannot produce any output.
    pub fn is_dust(&self) -> bool {
        match self {
            Pool::ConstantProduct(pool) => pool.is_dust(),
            Pool::StableSwap(pool) => pool.is_dust(),
            Pool::Bridge(pool) => pool.is_dust(),
        }
    }
}

impl From<ConstantProductPool> for Pool {
    fn from(pool: ConstantProductPool) -> Self {
        Pool::ConstantProduct(pool)
    }
}

impl From<StableSwapPool> for Pool {
    fn from(pool: StableSwapPool) -> Self {
        Pool::StableSwap(pool)
    }
}

impl From<BridgePool> for Pool {
    fn from(pool: BridgePool) -> Self {
        Pool::Bridge(pool)
    }
}

/// Shared immutable pool snapshot. Equality and ordering follow the pool id.
pub struct PoolWrapper {
    pub pool: Arc<Pool>,
}

impl PartialOrd for PoolWrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for PoolWrapper {}

impl Ord for PoolWrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.get_pool_id().cmp(&other.get_pool_id())
    }
}

impl Display for PoolWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(fee={})@{:?}", self.get_provider(), self.get_fee(), self.get_pool_id())
    }
}

impl Debug for PoolWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(fee={})@{:?}", self.get_provider(), self.get_fee(), self.get_pool_id())
    }
}

impl Hash for PoolWrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_pool_id().hash(state)
    }
}

impl PartialEq for PoolWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.pool.get_pool_id() == other.pool.get_pool_id()
    }
}

impl PoolWrapper {
    pub fn new(pool: Arc<Pool>) -> Self {
        PoolWrapper { pool }
    }
}

impl Clone for PoolWrapper {
    fn clone(&self) -> Self {
        Self { pool: self.pool.clone() }
    }
}

impl Deref for PoolWrapper {
    type Target = Pool;

    fn deref(&self) -> &Self::Target {
        self.pool.deref()
    }
}

impl From<Pool> for PoolWrapper {
    fn from(pool: Pool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

impl From<ConstantProductPool> for PoolWrapper {
    fn from(pool: ConstantProductPool) -> Self {
        Pool::from(pool).into()
    }
}

impl From<StableSwapPool> for PoolWrapper {
    fn from(pool: StableSwapPool) -> Self {
        Pool::from(pool).into()
    }
}

impl From<BridgePool> for PoolWrapper {
    fn from(pool: BridgePool) -> Self {
        Pool::from(pool).into()
    }
}

impl Serialize for PoolWrapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.pool.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PoolWrapper {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(PoolWrapper::from(Pool::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::logic::pools::{NewtonSolverConfig, Rebase};
    use alloy_primitives::U256;
    use strum::IntoEnumIterator;

    fn constant_product(address: u8, reserve0: u64, reserve1: u64) -> Pool {
        ConstantProductPool::new(
            Address::repeat_byte(address),
            Token::repeat_byte(1),
            Token::repeat_byte(2),
            U256::from(reserve0),
            U256::from(reserve1),
            0.003,
        )
        .into()
    }

    fn stable() -> Pool {
        StableSwapPool::new(
            Address::repeat_byte(30),
            Token::repeat_byte(1),
            Token::repeat_byte(2),
            U256::from(800_000_000_000u64),
            U256::from(1_000_000_000_000u64),
            Rebase::default(),
            Rebase::default(),
            50,
            0.0005,
        )
        .with_solver(NewtonSolverConfig::default())
        .into()
    }

    fn bridge(capacity: Option<u64>) -> Pool {
        let bridge = match capacity {
            Some(capacity) => {
                BridgePool::bounded(Address::repeat_byte(40), Token::repeat_byte(1), Token::repeat_byte(2), U256::from(capacity))
            }
            None => BridgePool::unbounded(Address::repeat_byte(40), Token::repeat_byte(1), Token::repeat_byte(2)),
        };
        bridge.into()
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PoolClass::ConstantProduct), "CONSTANT_PRODUCT");
        assert_eq!(format!("{}", PoolClass::BridgeBounded), "BRIDGE_BOUNDED");

        assert_eq!(format!("{}", LiquidityProvider::SushiSwap), "SUSHI_SWAP");
        assert_eq!(format!("{}", LiquidityProvider::BentoBridge), "BENTO_BRIDGE");
    }

    #[test]
    fn test_wire_tags() {
        for class in PoolClass::iter() {
            assert_eq!(PoolClass::from_wire_tag(class.wire_tag()), Some(class));
        }
        assert_eq!(PoolClass::from_wire_tag(4), None);
    }

    #[test]
    fn test_pool_wrapper_creation() -> eyre::Result<()> {
        let pool_wrapper = PoolWrapper::from(constant_product(2, 1000, 2000));
        assert_eq!(pool_wrapper.get_pool_id(), PoolId::Address(Address::repeat_byte(2)));
        assert_eq!(pool_wrapper.get_class(), PoolClass::ConstantProduct);
        assert_eq!(format!("{pool_wrapper}"), format!("SUSHI_SWAP(fee=0.003)@{:?}", PoolId::Address(Address::repeat_byte(2))));

        let serialized = serde_json::to_string(&pool_wrapper)?;
        assert!(serialized.contains("\"type\":\"CONSTANT_PRODUCT\""));
        let deserialized: PoolWrapper = serde_json::from_str(&serialized)?;
        assert_eq!(*deserialized.pool, *pool_wrapper.pool);
        Ok(())
    }

    #[test]
    fn test_bridge_classes() {
        assert_eq!(bridge(None).get_class(), PoolClass::BridgeUnbounded);
        assert_eq!(bridge(Some(50)).get_class(), PoolClass::BridgeBounded);
        assert_eq!(bridge(Some(50)).capacity(), Some(50.0));
        assert!(bridge(Some(50)).gas_spent() > bridge(None).gas_spent());
    }

    #[test]
    fn test_unknown_token_quotes_zero() -> eyre::Result<()> {
        let pool = constant_product(2, 1000, 2000);
        let stranger = Address::repeat_byte(99);
        assert_eq!(pool.quote_output(stranger, 10.0)?.amount_out, 0.0);
        assert_eq!(pool.liquidity(stranger), 0.0);
        assert!(pool.token_out(stranger).is_none());
        assert_eq!(pool.token_out(Address::repeat_byte(1)).map(|t| t.get_address()), Some(Address::repeat_byte(2)));
        Ok(())
    }

    #[test]
    fn test_price_impact_monotone_for_all_pools() -> eyre::Result<()> {
        let token_in = Address::repeat_byte(1);
        let small_sizes = vec![10.0, 1_000.0, 50_000.0, 400_000.0, 900_000.0, 5_000_000.0];
        let stable_sizes = vec![1e9, 1e10, 1e11, 4e11, 9e11];
        let cases = [
            (constant_product(2, 1_000_000, 2_000_000), small_sizes.clone()),
            (stable(), stable_sizes),
            (bridge(Some(500_000)), small_sizes.clone()),
            (bridge(None), small_sizes),
        ];
        for (pool, sizes) in cases {
            let mut previous = 0.0;
            for size in sizes {
                let impact = pool.price_impact_at(token_in, size)?;
                assert!(impact >= 0.0, "{pool:?} impact={impact}");
                assert!(impact >= previous - 1e-12, "{pool:?} size={size} impact={impact} previous={previous}");
                previous = impact;
            }
        }
        assert_eq!(constant_product(2, 1000, 2000).price_impact_at(token_in, 0.0)?, 0.0);
        Ok(())
    }
}
