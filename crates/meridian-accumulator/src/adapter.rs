//! The pool-adapter collaborator contract.
//!
//! A pool adapter knows how to read instantaneous price and liquidity for a
//! token from one particular venue. Venues differ in which pause signals
//! they expose — some halt at the venue level, some per pool, some both —
//! so the contract carries both signals with `false` defaults and adapters
//! override whichever their venue supports. Gating checks both.

use meridian_types::TokenId;

/// Instantaneous liquidity of a pool, in raw venue units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolLiquidity {
    /// Liquidity of the token itself.
    pub token_liquidity: u128,
    /// Liquidity of the quote token.
    pub quote_token_liquidity: u128,
}

/// Errors a pool adapter can surface while reading a venue.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// No instantaneous price is available for the token.
    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    /// No instantaneous liquidity is available for the token.
    #[error("liquidity unavailable: {0}")]
    LiquidityUnavailable(String),
}

/// Reads instantaneous market state from one liquidity venue.
pub trait PoolAdapter {
    /// Current price of one whole token in quote-token units.
    fn instant_price(&self, token: TokenId) -> Result<u128, AdapterError>;

    /// Current pool liquidity backing the token.
    fn instant_liquidity(&self, token: TokenId) -> Result<PoolLiquidity, AdapterError>;

    /// Venue-wide trading halt, when the venue exposes one.
    fn venue_paused(&self) -> bool {
        false
    }

    /// Pool-level pause flag for the pool backing `token`, when supported.
    fn pool_paused(&self, _token: TokenId) -> bool {
        false
    }
}
