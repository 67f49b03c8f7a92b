//! # meridian-store
//!
//! Bounded per-token history for the oracle engine.
//!
//! A [`ring::RingBuffer`] holds ordered snapshots in a circular arena whose
//! capacity can grow but never shrink; [`history::HistoryStore`] keys one
//! buffer per token and initializes it lazily on first use. Nothing is ever
//! deleted except by being overwritten when the buffer wraps.

pub mod history;
pub mod ring;

pub use history::HistoryStore;
pub use ring::{RingBuffer, MAX_CAPACITY};

/// Error types for history-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read past the retained window.
    #[error("invalid index: {index} >= count {count}")]
    InvalidIndex {
        /// The requested logical index (0 = newest).
        index: u16,
        /// Number of snapshots currently retained.
        count: u16,
    },

    /// A range read that the retained window cannot satisfy.
    #[error("insufficient data: need {required} snapshots, have {available}")]
    InsufficientData {
        /// Snapshots the requested range reaches back through.
        required: u32,
        /// Snapshots currently retained.
        available: u16,
    },

    /// Capacity is monotonically non-decreasing over a buffer's life.
    #[error("capacity cannot be decreased: current {current}, requested {requested}")]
    CapacityCannotBeDecreased {
        /// Current capacity.
        current: u16,
        /// Requested (not strictly larger) capacity.
        requested: u16,
    },

    /// Capacity above the hard per-token maximum.
    #[error("capacity too large: requested {requested}, maximum {maximum}")]
    CapacityTooLarge {
        /// Requested capacity.
        requested: u16,
        /// The hard maximum, [`MAX_CAPACITY`].
        maximum: u16,
    },
}

/// Convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
