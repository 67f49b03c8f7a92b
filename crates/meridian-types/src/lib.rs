//! # meridian-types
//!
//! Shared domain types for the Meridian oracle workspace: token identifiers,
//! observations, accumulation snapshots, and the event vocabulary emitted by
//! the oracle components.

pub mod events;
pub mod observation;

/// A token identifier: a 20-byte venue-level asset address.
pub type TokenId = [u8; 20];

/// The all-zero token identifier. Never a valid update target.
pub const ZERO_TOKEN: TokenId = [0u8; 20];

/// Scale for relative-change values and update thresholds.
///
/// A relative change of 100% is `CHANGE_PRECISION`; a 2% update threshold is
/// `2_000_000`.
pub const CHANGE_PRECISION: u128 = 100_000_000;

/// Scale for liquidity-ratio bounds. A ratio of 1.0 is `RATIO_SCALE`.
pub const RATIO_SCALE: u128 = 10_000;

/// Render the leading bytes of a token id as lowercase hex for log fields
/// and error messages.
pub fn short_hex(token: &TokenId) -> String {
    hex::encode(&token[..4])
}

/// Render a full token id as lowercase hex.
pub fn full_hex(token: &TokenId) -> String {
    hex::encode(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hex() {
        let token: TokenId = [0xab; 20];
        assert_eq!(short_hex(&token), "abababab");
    }

    #[test]
    fn test_full_hex_length() {
        assert_eq!(full_hex(&ZERO_TOKEN).len(), 40);
    }

    #[test]
    fn test_change_precision_is_one_hundred_percent() {
        assert_eq!(CHANGE_PRECISION, 100_000_000);
    }
}
