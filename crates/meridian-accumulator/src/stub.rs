//! In-memory pool adapter for development and tests.
//!
//! Serves prices and liquidity from plain tables and exposes both pause
//! signals as settable flags. The daemon drives a simulated market through
//! it; tests use it to script exact adapter behavior.

use std::collections::{HashMap, HashSet};

use meridian_types::{short_hex, TokenId};

use crate::{AdapterError, PoolAdapter, PoolLiquidity};

/// A pool adapter backed by in-memory tables.
#[derive(Clone, Debug, Default)]
pub struct StubPoolAdapter {
    prices: HashMap<TokenId, u128>,
    liquidity: HashMap<TokenId, PoolLiquidity>,
    venue_paused: bool,
    paused_pools: HashSet<TokenId>,
}

impl StubPoolAdapter {
    /// Create an adapter with empty tables; reads fail until values are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instantaneous price for a token.
    pub fn set_price(&mut self, token: TokenId, price: u128) {
        self.prices.insert(token, price);
    }

    /// Remove a token's price so reads fail, simulating a broken venue.
    pub fn clear_price(&mut self, token: TokenId) {
        self.prices.remove(&token);
    }

    /// Set the instantaneous liquidity for a token.
    pub fn set_liquidity(&mut self, token: TokenId, liquidity: PoolLiquidity) {
        self.liquidity.insert(token, liquidity);
    }

    /// Toggle the venue-wide pause signal.
    pub fn set_venue_paused(&mut self, paused: bool) {
        tracing::debug!(paused, "stub adapter: venue pause toggled");
        self.venue_paused = paused;
    }

    /// Toggle the pool-level pause signal for one token.
    pub fn set_pool_paused(&mut self, token: TokenId, paused: bool) {
        tracing::debug!(
            token = short_hex(&token),
            paused,
            "stub adapter: pool pause toggled"
        );
        if paused {
            self.paused_pools.insert(token);
        } else {
            self.paused_pools.remove(&token);
        }
    }
}

impl PoolAdapter for StubPoolAdapter {
    fn instant_price(&self, token: TokenId) -> Result<u128, AdapterError> {
        self.prices.get(&token).copied().ok_or_else(|| {
            AdapterError::PriceUnavailable(format!("no pool for token {}", short_hex(&token)))
        })
    }

    fn instant_liquidity(&self, token: TokenId) -> Result<PoolLiquidity, AdapterError> {
        self.liquidity.get(&token).copied().ok_or_else(|| {
            AdapterError::LiquidityUnavailable(format!("no pool for token {}", short_hex(&token)))
        })
    }

    fn venue_paused(&self) -> bool {
        self.venue_paused
    }

    fn pool_paused(&self, token: TokenId) -> bool {
        self.paused_pools.contains(&token)
    }
}
