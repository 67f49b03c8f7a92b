//! Price-time accumulator.
//!
//! Integration is left-rectangle: the price committed at the previous
//! snapshot is held constant across the elapsed interval, so
//! `cum_new = cum_old + price_prev * dt`, wrapping modulo 2^128. The first
//! snapshot for a token starts the sum at zero; only differences between
//! snapshots carry meaning.

use std::collections::HashMap;

use meridian_store::HistoryStore;
use meridian_types::{observation::PriceAccumulation, short_hex, TokenId, ZERO_TOKEN};

use crate::{gate, AccumulatorConfig, PoolAdapter, Result};

/// The instantaneous reading committed with the latest snapshot.
#[derive(Clone, Copy, Debug)]
struct PriceReading {
    price: u128,
    timestamp: u64,
}

/// Maintains per-token cumulative price-time sums, gated by the configured
/// threshold/delay/heartbeat rules.
#[derive(Clone, Debug)]
pub struct PriceAccumulator {
    config: AccumulatorConfig,
    quote_token: TokenId,
    /// Last committed instantaneous reading per token. Always in step with
    /// the newest snapshot in `snapshots`.
    readings: HashMap<TokenId, PriceReading>,
    snapshots: HistoryStore<PriceAccumulation>,
}

impl PriceAccumulator {
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
    /// The heartbeat and delay checks are answered from local state; only
    /// the threshold comparison reads the adapter.
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
        let price = adapter.instant_price(token)?;
        Ok(gate::change_threshold_surpassed(
            price,
            prev.price,
            self.config.update_threshold,
        ))
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

    /// Commit a fresh snapshot for `token` if the gate permits.
    ///
    /// Returns `Ok(false)` as a no-op for ordinary gating (not needed,
    /// invalid token, paused pool, zero elapsed time). The external read
    /// completes before any local state is touched.
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

        // Read phase: everything external happens here.
        let (needed, price) = match self.readings.get(&token) {
            None => (true, adapter.instant_price(token)?),
            Some(prev) => {
                if gate::heartbeat_due(prev.timestamp, now, self.config.heartbeat) {
                    (true, adapter.instant_price(token)?)
                } else if !gate::delay_satisfied(prev.timestamp, now, self.config.update_delay) {
                    return Ok(false);
                } else {
                    let price = adapter.instant_price(token)?;
                    let surpassed = gate::change_threshold_surpassed(
                        price,
                        prev.price,
                        self.config.update_threshold,
                    );
                    (surpassed, price)
                }
            }
        };
        if !needed {
            return Ok(false);
        }

        // Commit phase: no external calls below this point.
        let cumulative = match self.readings.get(&token) {
            None => 0u128,
            Some(prev) => {
                let dt = now.saturating_sub(prev.timestamp);
                if dt == 0 {
                    // Snapshot timestamps are strictly increasing per token.
                    return Ok(false);
                }
                let base = self
                    .snapshots
                    .latest(&token)
                    .map_or(0, |s| s.price_cumulative);
                base.wrapping_add(prev.price.wrapping_mul(u128::from(dt)))
            }
        };

        self.snapshots.push(
            token,
            PriceAccumulation {
                price_cumulative: cumulative,
                timestamp: now,
            },
        );
        self.readings.insert(token, PriceReading { price, timestamp: now });
        tracing::debug!(
            token = short_hex(&token),
            price,
            cumulative,
            timestamp = now,
            "price accumulator: snapshot committed"
        );
        Ok(true)
    }

    /// The cumulative sum extrapolated to `now` with the last committed
    /// reading. Purely local; `None` until the token has a first snapshot.
    pub fn current_accumulation(&self, token: TokenId, now: u64) -> Option<PriceAccumulation> {
        let reading = self.readings.get(&token)?;
        let latest = self.snapshots.latest(&token)?;
        let dt = now.saturating_sub(latest.timestamp);
        Some(PriceAccumulation {
            price_cumulative: latest
                .price_cumulative
                .wrapping_add(reading.price.wrapping_mul(u128::from(dt))),
            timestamp: latest.timestamp + dt,
        })
    }

    /// Timestamp of the newest committed snapshot for `token`.
    pub fn last_update_time(&self, token: TokenId) -> Option<u64> {
        self.readings.get(&token).map(|r| r.timestamp)
    }

    /// The longest this accumulator is normally allowed to go between
    /// snapshots; staleness beyond this plus a grace tolerance means the
    /// accumulator is broken, not merely idle.
    pub fn max_update_delay(&self) -> u64 {
        self.config.heartbeat
    }

    /// Read a committed snapshot, 0 = newest.
    ///
    /// # Errors
    ///
    /// - [`meridian_store::StoreError::InvalidIndex`] past the retained window
    pub fn snapshot(&self, token: TokenId, index: u16) -> Result<PriceAccumulation> {
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
}
