//! Per-source liquidity-quality validation.
//!
//! A source must report a positive price backed by liquidity on both sides
//! of the pool. Beyond that, an aggregation may require a minimum
//! token-liquidity value (the token side priced in quote units), a minimum
//! quote-token liquidity, and a bounded ratio between the two — a pool
//! whose sides are wildly imbalanced is quoting a price nobody can trade
//! at depth.

use meridian_math::wide::mul_div;
use meridian_types::{observation::Observation, RATIO_SCALE};

/// Liquidity-quality thresholds. A zero field disables that check.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationConfig {
    /// Minimum token-side liquidity priced in quote units, at the
    /// aggregation's price decimals.
    pub min_token_liquidity_value: u128,
    /// Minimum quote-token liquidity.
    pub min_quote_token_liquidity: u128,
    /// Minimum (token value : quote liquidity) ratio, at [`RATIO_SCALE`].
    pub min_liquidity_ratio: u128,
    /// Maximum (token value : quote liquidity) ratio, at [`RATIO_SCALE`].
    pub max_liquidity_ratio: u128,
}

/// Why a source was excluded from an aggregation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("zero price")]
    ZeroPrice,

    #[error("zero token liquidity")]
    ZeroTokenLiquidity,

    #[error("zero quote token liquidity")]
    ZeroQuoteTokenLiquidity,

    #[error("token liquidity value {value} below minimum {minimum}")]
    TokenLiquidityValueBelowMinimum { value: u128, minimum: u128 },

    #[error("quote token liquidity {liquidity} below minimum {minimum}")]
    QuoteTokenLiquidityBelowMinimum { liquidity: u128, minimum: u128 },

    #[error("liquidity ratio {ratio} outside [{minimum}, {maximum}]")]
    RatioOutOfRange {
        ratio: u128,
        minimum: u128,
        maximum: u128,
    },
}

/// Validate one source's observation against the thresholds.
///
/// `price_decimals` is the precision the observation's price is expressed
/// at; the token-liquidity value divides it back out so the thresholds are
/// in whole quote units. Comparison values saturate on overflow — a pool
/// too deep to measure passes every floor.
///
/// # Errors
///
/// - [`RejectReason`] naming the first failed check
pub fn validate(
    observation: &Observation,
    price_decimals: u8,
    config: &ValidationConfig,
) -> Result<(), RejectReason> {
    if observation.price == 0 {
        return Err(RejectReason::ZeroPrice);
    }
    if observation.token_liquidity == 0 {
        return Err(RejectReason::ZeroTokenLiquidity);
    }
    if observation.quote_token_liquidity == 0 {
        return Err(RejectReason::ZeroQuoteTokenLiquidity);
    }

    let unit = meridian_math::decimal::pow10(price_decimals).unwrap_or(u128::MAX);
    let value = mul_div(observation.token_liquidity, observation.price, unit)
        .unwrap_or(u128::MAX);

    if config.min_token_liquidity_value > 0 && value < config.min_token_liquidity_value {
        return Err(RejectReason::TokenLiquidityValueBelowMinimum {
            value,
            minimum: config.min_token_liquidity_value,
        });
    }
    if config.min_quote_token_liquidity > 0
        && observation.quote_token_liquidity < config.min_quote_token_liquidity
    {
        return Err(RejectReason::QuoteTokenLiquidityBelowMinimum {
            liquidity: observation.quote_token_liquidity,
            minimum: config.min_quote_token_liquidity,
        });
    }

    if config.min_liquidity_ratio > 0 || config.max_liquidity_ratio > 0 {
        let ratio = mul_div(value, RATIO_SCALE, observation.quote_token_liquidity)
            .unwrap_or(u128::MAX);
        let below = config.min_liquidity_ratio > 0 && ratio < config.min_liquidity_ratio;
        let above = config.max_liquidity_ratio > 0 && ratio > config.max_liquidity_ratio;
        if below || above {
            return Err(RejectReason::RatioOutOfRange {
                ratio,
                minimum: config.min_liquidity_ratio,
                maximum: config.max_liquidity_ratio,
            });
        }
    }

    Ok(())
}
