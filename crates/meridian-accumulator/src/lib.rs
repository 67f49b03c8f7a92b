//! # meridian-accumulator
//!
//! Cumulative-sum accumulators over instantaneous pool readings.
//!
//! An accumulator maintains, per token, a wrapping cumulative sum of
//! (instantaneous value x time) together with the reading the sum was last
//! advanced with. Two snapshots of the sum, differenced with wrapping
//! subtraction and divided by the elapsed time, yield a time-weighted
//! average — that derivation lives downstream in the oracle layer.
//!
//! Updates are gated: a fresh reading is only committed when no snapshot
//! exists yet, when the heartbeat has elapsed, or when the update delay has
//! passed and the value moved by at least the update threshold.
//!
//! ## Modules
//!
//! - [`adapter`] — the pool-adapter collaborator contract
//! - [`gate`] — update gating rules
//! - [`price`] — price-time accumulator
//! - [`liquidity`] — liquidity-time accumulator
//! - [`stub`] — in-memory pool adapter for development and tests

pub mod adapter;
pub mod gate;
pub mod liquidity;
pub mod price;
pub mod stub;

pub use adapter::{AdapterError, PoolAdapter, PoolLiquidity};
pub use gate::AccumulatorConfig;
pub use liquidity::LiquidityAccumulator;
pub use price::PriceAccumulator;
pub use stub::StubPoolAdapter;

/// Error types for accumulator operations.
#[derive(Debug, thiserror::Error)]
pub enum AccumulatorError {
    /// The pool adapter could not produce a reading. Distinct from "update
    /// not needed", which is an `Ok(false)` no-op.
    #[error("pool adapter fetch failed: {0}")]
    Fetch(#[from] AdapterError),

    /// Snapshot history store failure.
    #[error("snapshot store: {0}")]
    Store(#[from] meridian_store::StoreError),
}

/// Configuration errors raised at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The heartbeat bounds the maximum time between snapshots and must be
    /// non-zero.
    #[error("heartbeat must be non-zero")]
    ZeroHeartbeat,

    /// The update delay cannot exceed the heartbeat, or threshold-driven
    /// updates could never fire.
    #[error("update delay {update_delay} exceeds heartbeat {heartbeat}")]
    DelayExceedsHeartbeat { update_delay: u64, heartbeat: u64 },
}

/// Convenience result type for accumulator operations.
pub type Result<T> = std::result::Result<T, AccumulatorError>;
