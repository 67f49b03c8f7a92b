//! Observations and accumulation snapshots.
//!
//! An [`Observation`] is the latest trusted value for a token: a
//! time-weighted average price plus the liquidity depth backing it. An
//! accumulation snapshot is the raw material an observation is derived from:
//! a cumulative (value x time) sum together with the timestamp it was taken
//! at.
//!
//! Cumulative sums wrap modulo 2^128. A raw cumulative value is meaningless
//! in isolation; consumers must difference two snapshots with wrapping
//! subtraction and divide by the elapsed time between them.

use serde::{Deserialize, Serialize};

/// The latest trusted price and liquidity for a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Time-weighted average price in quote-token units, at the owning
    /// oracle's price decimals.
    pub price: u128,
    /// Time-weighted average liquidity of the token itself.
    pub token_liquidity: u128,
    /// Time-weighted average liquidity of the quote token.
    pub quote_token_liquidity: u128,
    /// Unix timestamp (seconds) the observation was derived at.
    pub timestamp: u64,
}

/// A cumulative price-time snapshot. Wraps modulo 2^128.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAccumulation {
    /// Sum of (instantaneous price x seconds held), wrapping.
    pub price_cumulative: u128,
    /// Unix timestamp (seconds) of the snapshot.
    pub timestamp: u64,
}

/// A cumulative liquidity-time snapshot. Both sums wrap modulo 2^128.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAccumulation {
    /// Sum of (instantaneous token liquidity x seconds held), wrapping.
    pub token_liquidity_cumulative: u128,
    /// Sum of (instantaneous quote-token liquidity x seconds held), wrapping.
    pub quote_token_liquidity_cumulative: u128,
    /// Unix timestamp (seconds) of the snapshot.
    pub timestamp: u64,
}

/// One buffered upstream reading: the price and liquidity accumulations a
/// periodic oracle pulled in a single update. The two halves carry their own
/// timestamps and are differenced independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulationPair {
    pub price: PriceAccumulation,
    pub liquidity: LiquidityAccumulation,
}
