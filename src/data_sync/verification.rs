use super::fetcher::PoolDataFetcher;
use super::registry::RegistrySnapshot;
use crate::logic::pools::{Pool, PoolId, Rebase};
use crate::utils::amounts::{close_values, u256_to_f64};
use alloy_primitives::{Address, U256};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Allowed drift between a snapshot and on-chain values. A value passes when it is within either bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationTolerance {
    pub relative: f64,
    pub absolute: f64,
    /// Absolute bound for stable pool reserves, which are compared as vault shares after a rounding conversion
    pub stable_reserve_absolute: f64,
}

impl Default for VerificationTolerance {
    fn default() -> Self {
        Self { relative: 1e-10, absolute: 10.0, stable_reserve_absolute: 1e6 }
    }
}

impl VerificationTolerance {
    fn matches(&self, expected: U256, actual: U256, absolute: f64) -> bool {
        close_values(u256_to_f64(expected), u256_to_f64(actual), self.relative, absolute)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolMismatch {
    pub pool_id: PoolId,
    pub field: String,
    pub expected: U256,
    pub actual: U256,
}

impl fmt::Display for PoolMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: snapshot {} on-chain {}", self.pool_id, self.field, self.expected, self.actual)
    }
}

/// Outcome of cross checking a snapshot against on-chain state.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub checked: usize,
    pub skipped: usize,
    pub mismatches: Vec<PoolMismatch>,
    /// Pools whose on-chain state could not be read
    pub errors: Vec<(PoolId, String)>,
}

impl VerificationReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty() && self.errors.is_empty()
    }

    pub fn ensure_consistent(&self) -> Result<()> {
        if self.is_consistent() {
            return Ok(());
        }
        let details: Vec<String> =
            self.mismatches.iter().map(|m| m.to_string()).chain(self.errors.iter().map(|(pool_id, e)| format!("{pool_id}: {e}"))).collect();
        Err(eyre!("Snapshot inconsistent with chain state: {}", details.join("; ")))
    }

    fn compare(&mut self, tolerance: &VerificationTolerance, pool_id: PoolId, field: &str, expected: U256, actual: U256, absolute: f64) {
        if !tolerance.matches(expected, actual, absolute) {
            warn!("Pool state mismatch pool={} field={} snapshot={} on_chain={}", pool_id, field, expected, actual);
            self.mismatches.push(PoolMismatch { pool_id, field: field.to_string(), expected, actual });
        }
    }
}

/// Cross check every pool of a snapshot against the fetcher's on-chain reads.
///
/// Constant product reserves are compared directly. Stable pools compare the vault totals of both tokens,
/// then the reported real reserves converted back to shares. Bounded bridges compare their capacity and
/// unbounded bridges are skipped.
pub async fn verify_pools_state(snapshot: &RegistrySnapshot, fetcher: &dyn PoolDataFetcher, tolerance: &VerificationTolerance) -> VerificationReport {
    let mut report = VerificationReport::default();
    let mut vault_cache: BTreeMap<Address, Rebase> = BTreeMap::new();

    for (pool_id, pool) in snapshot.pools.iter() {
        let pool_id = *pool_id;
        let outcome: Result<bool> = async {
            match pool.pool.as_ref() {
                Pool::ConstantProduct(cp) => {
                    let (reserve0, reserve1) = fetcher.pair_reserves(cp.address).await?;
                    report.compare(tolerance, pool_id, "reserve0", cp.reserve0, reserve0, tolerance.absolute);
                    report.compare(tolerance, pool_id, "reserve1", cp.reserve1, reserve1, tolerance.absolute);
                    Ok(true)
                }
                Pool::StableSwap(stable) => {
                    let mut totals = [stable.total0, stable.total1];
                    for (i, (token, expected)) in [(stable.token0.get_address(), stable.total0), (stable.token1.get_address(), stable.total1)].into_iter().enumerate() {
                        let actual = match vault_cache.get(&token) {
                            Some(total) => *total,
                            None => {
                                let total = fetcher.vault_totals(token).await?;
                                vault_cache.insert(token, total);
                                total
                            }
                        };
                        report.compare(tolerance, pool_id, &format!("total{i}.elastic"), expected.elastic, actual.elastic, tolerance.absolute);
                        report.compare(tolerance, pool_id, &format!("total{i}.base"), expected.base, actual.base, tolerance.absolute);
                        totals[i] = actual;
                    }

                    let (real0, real1) = fetcher.pair_reserves(stable.address).await?;
                    report.compare(tolerance, pool_id, "reserve0", stable.reserve0, totals[0].to_base(real0), tolerance.stable_reserve_absolute);
                    report.compare(tolerance, pool_id, "reserve1", stable.reserve1, totals[1].to_base(real1), tolerance.stable_reserve_absolute);
                    Ok(true)
                }
                Pool::Bridge(bridge) => match bridge.capacity {
                    Some(capacity) => {
                        let actual = fetcher.bridge_capacity(bridge.address).await?.ok_or_else(|| eyre!("Bridge reported no capacity"))?;
                        report.compare(tolerance, pool_id, "capacity", capacity, actual, tolerance.absolute);
                        Ok(true)
                    }
                    None => Ok(false),
                },
            }
        }
        .await;

        match outcome {
            Ok(true) => report.checked += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                warn!("Pool state unavailable pool={} error={}", pool_id, e);
                report.errors.push((pool_id, e.to_string()));
            }
        }
    }

    debug!("Pools verified checked={} skipped={} mismatches={} errors={}", report.checked, report.skipped, report.mismatches.len(), report.errors.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::fetcher::StaticPoolFetcher;
    use crate::logic::pools::{BridgePool, ConstantProductPool, PoolWrapper, StableSwapPool};
    use crate::utils::Token;

    fn fixtures() -> (PoolWrapper, PoolWrapper, PoolWrapper, PoolWrapper) {
        let token_a = Token::repeat_byte(1);
        let token_b = Token::repeat_byte(2);
        let token_c = Token::repeat_byte(3);
        let cp = ConstantProductPool::new(
            Address::repeat_byte(10),
            token_a.clone(),
            token_b.clone(),
            U256::from(1_000_000_000u64),
            U256::from(2_000_000_000u64),
            0.003,
        );
        let stable = StableSwapPool::new(
            Address::repeat_byte(11),
            token_b.clone(),
            token_c.clone(),
            U256::from(500_000_000_000u64),
            U256::from(600_000_000_000u64),
            Rebase::new(U256::from(3_000_000_000_000u64), U256::from(2_000_000_000_000u64)),
            Rebase::new(U256::from(1_000_000_000_000u64), U256::from(1_000_000_000_000u64)),
            100,
            0.0005,
        );
        let bounded = BridgePool::bounded(Address::repeat_byte(12), token_a.clone(), token_c.clone(), U256::from(5000u64));
        let unbounded = BridgePool::unbounded(Address::repeat_byte(13), token_b, token_c);
        (cp.into(), stable.into(), bounded.into(), unbounded.into())
    }

    #[tokio::test]
    async fn test_consistent_snapshot() -> eyre::Result<()> {
        let (cp, stable, bounded, unbounded) = fixtures();
        let pools = vec![cp, stable, bounded, unbounded];
        let fetcher = StaticPoolFetcher::new(1, pools.clone());
        let snapshot = RegistrySnapshot::from_pools(1, pools);

        let report = verify_pools_state(&snapshot, &fetcher, &VerificationTolerance::default()).await;
        assert_eq!(report.checked, 3);
        assert_eq!(report.skipped, 1);
        assert!(report.is_consistent());
        report.ensure_consistent()?;
        Ok(())
    }

    #[tokio::test]
    async fn test_drifted_reserves() -> eyre::Result<()> {
        let (cp, stable, bounded, _) = fixtures();
        let snapshot = RegistrySnapshot::from_pools(1, vec![cp.clone(), stable, bounded.clone()]);

        let mut drifted = match cp.pool.as_ref() {
            Pool::ConstantProduct(pool) => pool.clone(),
            _ => unreachable!(),
        };
        // within the absolute bound
        drifted.reserve0 += U256::from(5u64);
        // far outside both bounds
        drifted.reserve1 += U256::from(1_000_000u64);
        let fetcher = StaticPoolFetcher::new(1, vec![drifted.into(), bounded]);

        let report = verify_pools_state(&snapshot, &fetcher, &VerificationTolerance::default()).await;
        assert_eq!(report.checked, 2);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].field, "reserve1");
        // the stable pool is unknown to the fetcher
        assert_eq!(report.errors.len(), 1);
        assert!(!report.is_consistent());
        assert!(report.ensure_consistent().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_bridge_capacity_mismatch() {
        let (_, _, bounded, _) = fixtures();
        let snapshot = RegistrySnapshot::from_pools(1, vec![bounded]);
        let moved = BridgePool::bounded(Address::repeat_byte(12), Token::repeat_byte(1), Token::repeat_byte(3), U256::from(9000u64));
        let fetcher = StaticPoolFetcher::new(1, vec![moved.into()]);

        let report = verify_pools_state(&snapshot, &fetcher, &VerificationTolerance::default()).await;
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].field, "capacity");
    }

    #[test]
    fn test_tolerance_bounds() {
        let tolerance = VerificationTolerance::default();
        assert!(tolerance.matches(U256::from(100u64), U256::from(110u64), tolerance.absolute));
        assert!(!tolerance.matches(U256::from(100u64), U256::from(111u64), tolerance.absolute));
        let big = U256::from(10u64).pow(U256::from(30u64));
        // relative bound wins for large values
        assert!(tolerance.matches(big, big + U256::from(1_000_000u64), tolerance.absolute));
    }
}
