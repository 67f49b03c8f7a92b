//! Events published by the oracle components.
//!
//! Components record events into an internal buffer as they mutate state;
//! callers drain the buffer after each operation and forward the events to
//! whatever transport they use (the daemon logs them). Update failures that
//! were isolated rather than propagated — a single bad source inside an
//! aggregation — surface here, named, so monitoring can tell a degraded
//! source from a dead oracle.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::TokenId;

/// All events emitted by accumulators, oracles, and aggregators.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OracleEvent {
    /// A new observation was published for a token.
    Updated {
        #[serde_as(as = "serde_with::hex::Hex")]
        token: TokenId,
        price: u128,
        token_liquidity: u128,
        quote_token_liquidity: u128,
        timestamp: u64,
    },
    /// A source failed or was excluded during an update; the update itself
    /// carried on without it.
    UpdateError {
        /// Name of the offending source.
        source: String,
        #[serde_as(as = "serde_with::hex::Hex")]
        token: TokenId,
        /// Human-readable failure reason.
        reason: String,
    },
    /// An accumulation history buffer was grown by an administrative call.
    AccumulationCapacityIncreased {
        #[serde_as(as = "serde_with::hex::Hex")]
        token: TokenId,
        old_capacity: u16,
        new_capacity: u16,
    },
    /// An observation history buffer was grown by an administrative call.
    ObservationCapacityIncreased {
        #[serde_as(as = "serde_with::hex::Hex")]
        token: TokenId,
        old_capacity: u16,
        new_capacity: u16,
    },
}
