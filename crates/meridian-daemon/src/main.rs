//! meridian-daemon: the oracle keeper.
//!
//! Single OS process running a Tokio runtime. Drives a periodic TWAP oracle
//! over a simulated pool feed: each tick nudges the simulated market,
//! offers both accumulators a chance to commit, runs the oracle update, and
//! logs the events that came out of it.

mod config;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use rand::Rng;
use tracing::{info, warn};

use meridian_accumulator::{AccumulatorConfig, PoolAdapter, PoolLiquidity, StubPoolAdapter};
use meridian_oracle::{
    HistoricalOracle, Oracle, OracleConfig, PeriodicOracle, UpdateableOracle,
};
use meridian_types::{events::OracleEvent, short_hex, TokenId};

use crate::config::DaemonConfig;

/// One token under management.
struct ManagedToken {
    id: TokenId,
    symbol: String,
}

fn parse_token_id(hex_id: &str) -> anyhow::Result<TokenId> {
    let bytes = hex::decode(hex_id).with_context(|| format!("token id is not hex: {hex_id}"))?;
    let token: TokenId = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("token id must be 20 bytes: {hex_id}"))?;
    Ok(token)
}

fn unix_now() -> anyhow::Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before the epoch")?
        .as_secs())
}

/// Nudge a simulated price by up to +-1%.
fn drift(price: u128, rng: &mut impl Rng) -> u128 {
    let basis_points: i32 = rng.gen_range(-100..=100);
    let scaled = price / 10_000 * u128::from(basis_points.unsigned_abs());
    if basis_points < 0 {
        price.saturating_sub(scaled).max(1)
    } else {
        price.saturating_add(scaled)
    }
}

fn log_event(event: &OracleEvent) {
    match event {
        OracleEvent::Updated {
            token,
            price,
            token_liquidity,
            quote_token_liquidity,
            timestamp,
        } => info!(
            token = short_hex(token),
            price,
            token_liquidity,
            quote_token_liquidity,
            timestamp,
            "observation published"
        ),
        OracleEvent::UpdateError {
            source,
            token,
            reason,
        } => warn!(
            source = source.as_str(),
            token = short_hex(token),
            reason = reason.as_str(),
            "update error"
        ),
        OracleEvent::AccumulationCapacityIncreased {
            token,
            old_capacity,
            new_capacity,
        } => info!(
            token = short_hex(token),
            old_capacity, new_capacity, "accumulation capacity increased"
        ),
        OracleEvent::ObservationCapacityIncreased {
            token,
            old_capacity,
            new_capacity,
        } => info!(
            token = short_hex(token),
            old_capacity, new_capacity, "observation capacity increased"
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meridian=info".parse()?),
        )
        .init();

    info!("Meridian keeper starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    anyhow::ensure!(!config.tokens.is_empty(), "no tokens configured");
    let quote_token = parse_token_id(&config.oracle.quote_token)?;

    // 2. Seed the simulated feed
    let mut adapter = StubPoolAdapter::new();
    let mut tokens = Vec::with_capacity(config.tokens.len());
    for section in &config.tokens {
        let id = parse_token_id(&section.id)?;
        adapter.set_price(id, u128::from(section.start_price));
        adapter.set_liquidity(
            id,
            PoolLiquidity {
                token_liquidity: u128::from(section.token_liquidity),
                quote_token_liquidity: u128::from(section.quote_token_liquidity),
            },
        );
        tokens.push(ManagedToken {
            id,
            symbol: if section.symbol.is_empty() {
                short_hex(&id)
            } else {
                section.symbol.clone()
            },
        });
    }

    // 3. Build the oracle
    let oracle_config = OracleConfig {
        period: config.oracle.period,
        granularity: config.oracle.granularity,
        grace: config.oracle.grace,
        price_decimals: config.oracle.price_decimals,
        liquidity_decimals: config.oracle.liquidity_decimals,
        quote_token,
    };
    let accumulator_config = AccumulatorConfig::new(
        u128::from(config.accumulator.update_threshold),
        config.accumulator.update_delay,
        config.accumulator.heartbeat,
    )?;
    let mut oracle = PeriodicOracle::new(oracle_config, accumulator_config, adapter)?;

    // Retain a day of observations per token.
    let retained = (86_400 / config.oracle.period).clamp(2, 1_440) as u16;
    for token in &tokens {
        oracle.set_observations_capacity(token.id, retained)?;
    }
    oracle.take_events(); // capacity growth at boot is not news

    // 4. Keeper loop: one tick per accumulation slot
    let tick_seconds = (config.oracle.period / u64::from(config.oracle.granularity)).max(1);
    let mut interval = tokio::time::interval(Duration::from_secs(tick_seconds));
    let mut rng = rand::thread_rng();
    info!(
        tokens = tokens.len(),
        period = config.oracle.period,
        granularity = config.oracle.granularity,
        tick_seconds,
        "keeper running"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = unix_now()?;
                for token in &tokens {
                    // Drift the simulated market before reading it.
                    if let Ok(price) = oracle.adapter().instant_price(token.id) {
                        let next = drift(price, &mut rng);
                        oracle.adapter_mut().set_price(token.id, next);
                    }

                    if let Err(err) = oracle.update_accumulators(token.id, now) {
                        warn!(token = token.symbol.as_str(), error = %err, "accumulator update failed");
                        continue;
                    }
                    match oracle.update(token.id, now) {
                        Ok(true) => {
                            if let Ok(observation) = oracle.consult(token.id, now) {
                                info!(
                                    token = token.symbol.as_str(),
                                    price = observation.price,
                                    age = now - observation.timestamp,
                                    "quote"
                                );
                            }
                        }
                        Ok(false) => {}
                        Err(err) => {
                            warn!(token = token.symbol.as_str(), error = %err, "oracle update failed");
                        }
                    }
                }
                for event in oracle.take_events() {
                    log_event(&event);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("Meridian keeper stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_id() {
        let token = parse_token_id("1111111111111111111111111111111111111111").expect("parse");
        assert_eq!(token, [0x11; 20]);
    }

    #[test]
    fn test_parse_token_id_rejects_bad_input() {
        assert!(parse_token_id("nothex").is_err());
        assert!(parse_token_id("11").is_err());
    }

    #[test]
    fn test_drift_stays_within_one_percent() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let next = drift(1_000_000, &mut rng);
            assert!((990_000..=1_010_000).contains(&next));
        }
    }

    #[test]
    fn test_drift_never_reaches_zero() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert!(drift(1, &mut rng) >= 1);
        }
    }
}
