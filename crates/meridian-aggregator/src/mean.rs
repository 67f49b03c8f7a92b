//! Liquidity-weighted harmonic mean.
//!
//! Price is a ratio (quote per token), and the correct combination of
//! ratios sourced from pools of differing depth is the weighted harmonic
//! mean:
//!
//! ```text
//! aggregated = sum(w_i) / sum(w_i / price_i)
//! ```
//!
//! with `w_i` the quote-token liquidity behind source `i`. The division
//! terms are carried at a 2^64 internal scale through 256-bit
//! intermediates, so precision is lost only in the final truncation.

use meridian_math::wide::mul_div;

/// Internal fixed-point scale for the reciprocal terms.
const HARMONIC_SCALE: u128 = 1 << 64;

/// Weighted harmonic mean over `(price, weight)` entries.
///
/// Every entry must carry a non-zero price and weight; callers validate
/// before combining. Returns `None` when there are no entries or when any
/// intermediate value cannot be represented — callers treat that as a hard
/// failure, never a clamp.
pub fn weighted_harmonic_mean(entries: &[(u128, u128)]) -> Option<u128> {
    if entries.is_empty() {
        return None;
    }

    let mut weight_sum: u128 = 0;
    let mut reciprocal_sum: u128 = 0;
    for &(price, weight) in entries {
        weight_sum = weight_sum.checked_add(weight)?;
        reciprocal_sum = reciprocal_sum.checked_add(mul_div(weight, HARMONIC_SCALE, price)?)?;
    }
    if reciprocal_sum == 0 {
        return None;
    }
    mul_div(weight_sum, HARMONIC_SCALE, reciprocal_sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry_is_identity() {
        assert_eq!(weighted_harmonic_mean(&[(500, 7)]), Some(500));
    }

    #[test]
    fn test_equal_prices_any_weights() {
        assert_eq!(weighted_harmonic_mean(&[(200, 1), (200, 999)]), Some(200));
    }

    #[test]
    fn test_equal_weights_two_prices() {
        // 2 / (1/1 + 1/2) = 4/3; at two price decimals that is 133.
        assert_eq!(weighted_harmonic_mean(&[(100, 1), (200, 1)]), Some(133));
    }

    #[test]
    fn test_weight_dominance() {
        // A source a million times deeper pulls the mean to itself.
        let mean =
            weighted_harmonic_mean(&[(100, 1), (200, 1_000_000)]).expect("mean");
        assert!(mean >= 199 && mean <= 200, "mean was {mean}");
    }

    #[test]
    fn test_harmonic_is_below_arithmetic() {
        let mean = weighted_harmonic_mean(&[(100, 1), (300, 1)]).expect("mean");
        // Harmonic mean of 100 and 300 is 150, not the arithmetic 200.
        assert_eq!(mean, 150);
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(weighted_harmonic_mean(&[]), None);
    }

    #[test]
    fn test_weight_sum_overflow_is_none() {
        assert_eq!(
            weighted_harmonic_mean(&[(100, u128::MAX), (100, u128::MAX)]),
            None
        );
    }

    #[test]
    fn test_large_realistic_values() {
        // 18-decimal prices with deep pools still combine.
        let p = 2_000_000_000_000_000_000u128; // 2.0 at 18 decimals
        let q = 4_000_000_000_000_000_000u128; // 4.0 at 18 decimals
        let w = 50_000_000_000_000_000_000_000u128; // 50k quote units
        let mean = weighted_harmonic_mean(&[(p, w), (q, w)]).expect("mean");
        // 2 / (1/2 + 1/4) = 8/3 at 18 decimals.
        let expected = 2_666_666_666_666_666_666u128;
        assert!(mean.abs_diff(expected) <= 1, "mean was {mean}");
    }
}
