//! Liquidity-time accumulator.
//!
//! Mirrors the price accumulator but integrates both sides of the pool at
//! once: token liquidity and quote-token liquidity each get their own
//! wrapping cumulative sum, committed together under one timestamp. The
//! change threshold fires on whichever side moved more.

use std::collections::HashMap;

use meridian_store::HistoryStore;
use meridian_types::{observation::LiquidityAccumulation, short_hex, TokenId, ZERO_TOKEN};

use crate::{gate, AccumulatorConfig, PoolAdapter, PoolLiquidity, Result};

/// The instantaneous reading committed with the latest snapshot.
#[derive(Clone, Copy, Debug)]
struct LiquidityReading {
    liquidity: PoolLiquidity,
    timestamp: u64,
}

/// Maintains per-token cumulative liquidity-time sums, gated by the
/// configured threshold/delay/heartbeat rules.
#[derive(Clone, Debug)]
pub struct LiquidityAccumulator {
    config: AccumulatorConfig,
    quote_token: TokenId,
    readings: HashMap<TokenId, LiquidityReading>,
    snapshots: HistoryStore<LiquidityAccumulation>,
}

impl LiquidityAccumulator {
    /// Create an accumulator whose per-token snapshot buffers initialize at
    /// `snapshot_capacity` slots.
    pub fn new(config: AccumulatorConfig, quote_token: TokenId, snapshot_capacity: u16) -> Self {
        Self {
            config,
            quote_token,
            readings: HashMap::new(),
            snapshots: HistoryStore::new(snapshot_capacity),
        }
    }

    /// Whether the gating rules permit a fresh snapshot for `token`.
    ///
    /// # Errors
    ///
    /// - [`crate::AccumulatorError::Fetch`] if the threshold comparison
    ///   needs a reading and the adapter cannot produce one
    pub fn needs_update<A: PoolAdapter>(
        &self,
        adapter: &A,
        token: TokenId,
        now: u64,
    ) -> Result<bool> {
        let Some(prev) = self.readings.get(&token) else {
            return Ok(true);
        };
        if gate::heartbeat_due(prev.timestamp, now, self.config.heartbeat) {
            return Ok(true);
        }
        if !gate::delay_satisfied(prev.timestamp, now, self.config.update_delay) {
            return Ok(false);
        }
        let liquidity = adapter.instant_liquidity(token)?;
        Ok(self.threshold_surpassed(&liquidity, &prev.liquidity))
    }

    /// [`needs_update`](Self::needs_update) plus the validity checks on the
    /// token and the venue's pause signals.
    pub fn can_update<A: PoolAdapter>(
        &self,
        adapter: &A,
        token: TokenId,
        now: u64,
    ) -> Result<bool> {
        if self.gated_out(adapter, token) {
            return Ok(false);
        }
        self.needs_update(adapter, token, now)
    }

    /// Commit a fresh snapshot for `token` if the gate permits. `Ok(false)`
    /// is the ordinary-gating no-op; the external read completes before any
    /// local state is touched.
    ///
    /// # Errors
    ///
    /// - [`crate::AccumulatorError::Fetch`] if the adapter cannot read
    pub fn update<A: PoolAdapter>(
        &mut self,
        adapter: &A,
        token: TokenId,
        now: u64,
    ) -> Result<bool> {
        if self.gated_out(adapter, token) {
            return Ok(false);
        }

        // Read phase.
        let (needed, liquidity) = match self.readings.get(&token) {
            None => (true, adapter.instant_liquidity(token)?),
            Some(prev) => {
                if gate::heartbeat_due(prev.timestamp, now, self.config.heartbeat) {
                    (true, adapter.instant_liquidity(token)?)
                } else if !gate::delay_satisfied(prev.timestamp, now, self.config.update_delay) {
                    return Ok(false);
                } else {
                    let liquidity = adapter.instant_liquidity(token)?;
                    (
                        self.threshold_surpassed(&liquidity, &prev.liquidity),
                        liquidity,
                    )
                }
            }
        };
        if !needed {
            return Ok(false);
        }

        // Commit phase.
        let (token_cumulative, quote_cumulative) = match self.readings.get(&token) {
            None => (0u128, 0u128),
            Some(prev) => {
                let dt = now.saturating_sub(prev.timestamp);
                if dt == 0 {
                    return Ok(false);
                }
                let base = self.snapshots.latest(&token).copied().unwrap_or_default();
                (
                    base.token_liquidity_cumulative
                        .wrapping_add(prev.liquidity.token_liquidity.wrapping_mul(u128::from(dt))),
                    base.quote_token_liquidity_cumulative.wrapping_add(
                        prev.liquidity
                            .quote_token_liquidity
                            .wrapping_mul(u128::from(dt)),
                    ),
                )
            }
        };

        self.snapshots.push(
            token,
            LiquidityAccumulation {
                token_liquidity_cumulative: token_cumulative,
                quote_token_liquidity_cumulative: quote_cumulative,
                timestamp: now,
            },
        );
        self.readings.insert(
            token,
            LiquidityReading {
                liquidity,
                timestamp: now,
            },
        );
        tracing::debug!(
            token = short_hex(&token),
            token_liquidity = liquidity.token_liquidity,
            quote_token_liquidity = liquidity.quote_token_liquidity,
            timestamp = now,
            "liquidity accumulator: snapshot committed"
        );
        Ok(true)
    }

    /// The cumulative sums extrapolated to `now` with the last committed
    /// reading. Purely local; `None` until the token has a first snapshot.
    pub fn current_accumulation(&self, token: TokenId, now: u64) -> Option<LiquidityAccumulation> {
        let reading = self.readings.get(&token)?;
        let latest = self.snapshots.latest(&token)?;
        let dt = now.saturating_sub(latest.timestamp);
        Some(LiquidityAccumulation {
            token_liquidity_cumulative: latest.token_liquidity_cumulative.wrapping_add(
                reading.liquidity.token_liquidity.wrapping_mul(u128::from(dt)),
            ),
            quote_token_liquidity_cumulative: latest.quote_token_liquidity_cumulative.wrapping_add(
                reading
                    .liquidity
                    .quote_token_liquidity
                    .wrapping_mul(u128::from(dt)),
            ),
            timestamp: latest.timestamp + dt,
        })
    }

    /// Timestamp of the newest committed snapshot for `token`.
    pub fn last_update_time(&self, token: TokenId) -> Option<u64> {
        self.readings.get(&token).map(|r| r.timestamp)
    }

    /// See [`crate::PriceAccumulator::max_update_delay`].
    pub fn max_update_delay(&self) -> u64 {
        self.config.heartbeat
    }

    /// Read a committed snapshot, 0 = newest.
    ///
    /// # Errors
    ///
    /// - [`meridian_store::StoreError::InvalidIndex`] past the retained window
    pub fn snapshot(&self, token: TokenId, index: u16) -> Result<LiquidityAccumulation> {
        Ok(*self.snapshots.get(&token, index)?)
    }

    /// Snapshots retained for `token`.
    pub fn snapshots_count(&self, token: TokenId) -> u16 {
        self.snapshots.count(&token)
    }

    /// Grow the token's snapshot buffer; returns `(old, new)` capacity.
    ///
    /// # Errors
    ///
    /// - [`meridian_store::StoreError::CapacityCannotBeDecreased`],
    ///   [`meridian_store::StoreError::CapacityTooLarge`]
    pub fn set_snapshots_capacity(&mut self, token: TokenId, capacity: u16) -> Result<(u16, u16)> {
        Ok(self.snapshots.set_capacity(token, capacity)?)
    }

    fn gated_out<A: PoolAdapter>(&self, adapter: &A, token: TokenId) -> bool {
        token == ZERO_TOKEN
            || token == self.quote_token
            || adapter.venue_paused()
            || adapter.pool_paused(token)
    }

    fn threshold_surpassed(&self, current: &PoolLiquidity, previous: &PoolLiquidity) -> bool {
        gate::change_threshold_surpassed(
            current.token_liquidity,
            previous.token_liquidity,
            self.config.update_threshold,
        ) || gate::change_threshold_surpassed(
            current.quote_token_liquidity,
            previous.quote_token_liquidity,
            self.config.update_threshold,
        )
    }
}
