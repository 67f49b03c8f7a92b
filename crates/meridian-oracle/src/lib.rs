//! # meridian-oracle
//!
//! The periodic TWAP oracle and the consult surface shared by every oracle
//! in the workspace.
//!
//! A [`periodic::PeriodicOracle`] owns one price accumulator and one
//! liquidity accumulator over a pool adapter. Each update pulls the current
//! accumulations, buffers them, and once enough history exists derives a
//! time-weighted observation from the snapshot exactly one granularity
//! window back. Consumers read through the capability traits in
//! [`consult`], which the aggregation layer implements as well — an
//! aggregator is just another oracle.
//!
//! ## Modules
//!
//! - [`consult`] — capability traits: price, liquidity, consult, update,
//!   history
//! - [`periodic`] — the periodic accumulation oracle

use std::fmt;

use meridian_accumulator::AccumulatorError;
use meridian_store::StoreError;

pub mod consult;
pub mod periodic;

pub use consult::{HistoricalOracle, LiquidityOracle, Oracle, PriceOracle, UpdateableOracle};
pub use periodic::{OracleConfig, OracleState, PeriodicOracle};

/// Which upstream accumulator a staleness failure names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    /// The price-time accumulator.
    Price,
    /// The liquidity-time accumulator.
    Liquidity,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Price => f.write_str("price"),
            Upstream::Liquidity => f.write_str("liquidity"),
        }
    }
}

/// Error types for oracle reads and updates.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// No observation has ever been published for the token.
    #[error("no observation for token {token}")]
    MissingObservation {
        /// Hex-rendered token id.
        token: String,
    },

    /// The stored observation is older than the caller allows.
    #[error("rate too old: age {age}s exceeds maximum {max_age}s")]
    RateTooOld {
        /// Seconds since the observation was derived.
        age: u64,
        /// The caller's maximum acceptable age.
        max_age: u64,
    },

    /// An upstream accumulator needs an update and has been stale for
    /// longer than its own maximum update delay plus the grace tolerance.
    #[error(
        "{upstream} accumulator stale for token {token}: last update {last_update}, \
         now {now}, allowed {allowed}s"
    )]
    UpstreamStale {
        upstream: Upstream,
        token: String,
        last_update: u64,
        now: u64,
        /// Maximum tolerated staleness: the upstream's max update delay plus
        /// the grace tolerance.
        allowed: u64,
    },

    /// An upstream accumulator has no history at all for the token.
    #[error("{upstream} accumulator has no accumulation for token {token}")]
    UpstreamMissing { upstream: Upstream, token: String },

    /// Two accumulation snapshots carry the same timestamp but different
    /// cumulative values. A rate derived from them would be meaningless.
    #[error("zero elapsed time between differing accumulations")]
    TimeElapsedZero,

    /// A combined or rescaled value cannot be represented. Liquidity sums
    /// clamp instead; this is for the paths that must not.
    #[error("arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    /// Every source was excluded during an aggregation.
    #[error("no valid consultations for token {token}")]
    NoValidConsultations {
        /// Hex-rendered token id.
        token: String,
    },

    /// Failure surfaced by an owned accumulator.
    #[error(transparent)]
    Accumulator(#[from] AccumulatorError),

    /// Failure surfaced by a history store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration errors raised at construction time. Always the caller's
/// mistake; never recoverable at runtime.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The period between published observations must be non-zero.
    #[error("period must be non-zero")]
    ZeroPeriod,

    /// The granularity (snapshots per observation window) must be non-zero.
    #[error("granularity must be non-zero")]
    ZeroGranularity,

    /// The period must divide evenly into granularity steps.
    #[error("period {period} is not a multiple of granularity {granularity}")]
    PeriodNotMultipleOfGranularity { period: u64, granularity: u16 },

    /// An aggregation needs at least one source.
    #[error("source list is empty")]
    EmptySources,

    /// Aggregation sources must be distinct.
    #[error("duplicate source: {0}")]
    DuplicateSource(String),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
