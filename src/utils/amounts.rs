use alloy_primitives::U256;

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const TWO_POW_128: f64 = 340_282_366_920_938_463_463_374_607_431_768_211_456.0;

/// Lossy conversion of a raw on-chain amount into a float used by the pricing math.
pub fn u256_to_f64(value: U256) -> f64 {
    value.as_limbs().iter().rev().fold(0f64, |acc, limb| acc * TWO_POW_64 + *limb as f64)
}

/// Floor conversion of a float amount back into raw units. Negative and non-finite values map to zero,
/// values above the U256 range saturate.
pub fn f64_to_u256(value: f64) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    let value = value.floor();
    if value < TWO_POW_128 {
        return U256::from(value as u128);
    }
    U256::from_str_radix(&format!("{value:.0}"), 10).unwrap_or(U256::MAX)
}

/// Compare two amounts with a relative and an absolute tolerance. Either bound is enough.
pub fn close_values(a: f64, b: f64, relative: f64, absolute: f64) -> bool {
    let diff = (a - b).abs();
    diff <= absolute || diff <= relative * a.abs().max(b.abs())
}
