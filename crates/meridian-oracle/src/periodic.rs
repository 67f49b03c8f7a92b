//! The periodic accumulation oracle.
//!
//! Per token, the oracle walks a three-state machine: uninitialized, partial
//! history (fewer than `granularity` accumulation pairs buffered), and
//! active (an observation has been published). Every successful update pulls
//! the current accumulation from both upstream accumulators and buffers the
//! pair; once `granularity` pairs exist, the observation is the wrapping
//! delta between the incoming pair and the pair exactly `granularity` pushes
//! back, divided by the elapsed time of each half.
//!
//! Upstream freshness is the update precondition: an accumulator that needs
//! an update and has gone unrefreshed past its own heartbeat plus the grace
//! tolerance fails the update, naming itself.

use meridian_accumulator::{
    AccumulatorConfig, AccumulatorError, LiquidityAccumulator, PoolAdapter, PriceAccumulator,
};
use meridian_math::wrapping_delta;
use meridian_store::HistoryStore;
use meridian_types::{
    events::OracleEvent,
    observation::{AccumulationPair, LiquidityAccumulation, Observation, PriceAccumulation},
    short_hex, TokenId, ZERO_TOKEN,
};

use crate::consult::{
    check_age, HistoricalOracle, LiquidityOracle, Oracle, PriceOracle, UpdateableOracle,
};
use crate::{ConfigError, OracleError, Result, Upstream};

/// Default grace tolerance: how far past its heartbeat an upstream may drift
/// before updates fail rather than proceed on stale accumulations.
pub const DEFAULT_GRACE: u64 = 3600;

/// Parameters of a periodic oracle.
#[derive(Clone, Copy, Debug)]
pub struct OracleConfig {
    /// Minimum seconds between published observations.
    pub period: u64,
    /// Accumulation pairs spanned by one observation; also the default
    /// capacity of the pair buffer.
    pub granularity: u16,
    /// Extra staleness allowed to an upstream beyond its own heartbeat.
    pub grace: u64,
    /// Decimal precision of published prices.
    pub price_decimals: u8,
    /// Decimal precision of published liquidity values.
    pub liquidity_decimals: u8,
    /// The denominator asset all prices are expressed in.
    pub quote_token: TokenId,
}

impl OracleConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroPeriod`], [`ConfigError::ZeroGranularity`],
    ///   [`ConfigError::PeriodNotMultipleOfGranularity`]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.granularity == 0 {
            return Err(ConfigError::ZeroGranularity);
        }
        if self.period % u64::from(self.granularity) != 0 {
            return Err(ConfigError::PeriodNotMultipleOfGranularity {
                period: self.period,
                granularity: self.granularity,
            });
        }
        Ok(())
    }
}

/// Where a token currently sits in the oracle's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OracleState {
    /// No accumulation pair buffered yet.
    Uninitialized,
    /// Buffering toward the first observation.
    PartialHistory { buffered: u16, granularity: u16 },
    /// At least one observation has been published.
    Active,
}

/// A TWAP oracle over one pool adapter, updated at a fixed period.
#[derive(Debug)]
pub struct PeriodicOracle<A: PoolAdapter> {
    config: OracleConfig,
    adapter: A,
    price_accumulator: PriceAccumulator,
    liquidity_accumulator: LiquidityAccumulator,
    /// Buffered upstream accumulation pairs, per token.
    pairs: HistoryStore<AccumulationPair>,
    /// Published observation history, per token.
    observations: HistoryStore<Observation>,
    events: Vec<OracleEvent>,
}

impl<A: PoolAdapter> PeriodicOracle<A> {
    /// Build an oracle over `adapter` with validated configuration. Both
    /// owned accumulators share `accumulator_config` and the oracle's quote
    /// token.
    ///
    /// # Errors
    ///
    /// - [`ConfigError`] variants from [`OracleConfig::validate`]
    pub fn new(
        config: OracleConfig,
        accumulator_config: AccumulatorConfig,
        adapter: A,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let snapshot_capacity = config.granularity;
        Ok(Self {
            config,
            adapter,
            price_accumulator: PriceAccumulator::new(
                accumulator_config,
                config.quote_token,
                snapshot_capacity,
            ),
            liquidity_accumulator: LiquidityAccumulator::new(
                accumulator_config,
                config.quote_token,
                snapshot_capacity,
            ),
            pairs: HistoryStore::new(config.granularity),
            observations: HistoryStore::new(1),
            events: Vec::new(),
        })
    }

    /// The oracle's configuration.
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Shared access to the pool adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutable access to the pool adapter (simulated feeds, tests).
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// The owned price accumulator.
    pub fn price_accumulator(&self) -> &PriceAccumulator {
        &self.price_accumulator
    }

    /// The owned liquidity accumulator.
    pub fn liquidity_accumulator(&self) -> &LiquidityAccumulator {
        &self.liquidity_accumulator
    }

    /// Where `token` sits in the oracle's lifecycle.
    pub fn state(&self, token: TokenId) -> OracleState {
        if self.observations.count(&token) > 0 {
            return OracleState::Active;
        }
        match self.pairs.count(&token) {
            0 => OracleState::Uninitialized,
            buffered => OracleState::PartialHistory {
                buffered,
                granularity: self.config.granularity,
            },
        }
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drive both owned accumulators for `token`; each gates itself.
    /// Returns which of (price, liquidity) committed a snapshot.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Accumulator`] on adapter fetch failures
    pub fn update_accumulators(&mut self, token: TokenId, now: u64) -> Result<(bool, bool)> {
        let price = self.price_accumulator.update(&self.adapter, token, now)?;
        let liquidity = self
            .liquidity_accumulator
            .update(&self.adapter, token, now)?;
        Ok((price, liquidity))
    }

    /// Grow the token's accumulation-pair buffer; records an
    /// [`OracleEvent::AccumulationCapacityIncreased`].
    ///
    /// # Errors
    ///
    /// - [`OracleError::Store`] on decrease or past the hard maximum
    pub fn set_accumulations_capacity(&mut self, token: TokenId, capacity: u16) -> Result<()> {
        let (old_capacity, new_capacity) = self.pairs.set_capacity(token, capacity)?;
        tracing::info!(
            token = short_hex(&token),
            old_capacity,
            new_capacity,
            "periodic oracle: accumulation capacity increased"
        );
        self.events.push(OracleEvent::AccumulationCapacityIncreased {
            token,
            old_capacity,
            new_capacity,
        });
        Ok(())
    }

    fn identity_observation(&self, now: u64) -> Result<Observation> {
        let price = meridian_math::decimal::pow10(self.config.price_decimals).ok_or(
            OracleError::ArithmeticOverflow {
                context: "quote token identity price",
            },
        )?;
        Ok(Observation {
            price,
            token_liquidity: 0,
            quote_token_liquidity: 0,
            timestamp: now,
        })
    }

    fn stored_observation(&self, token: TokenId) -> Result<Observation> {
        self.observations
            .latest(&token)
            .copied()
            .ok_or_else(|| OracleError::MissingObservation {
                token: short_hex(&token),
            })
    }

    fn live_observation(&self, token: TokenId, now: u64) -> Result<Observation> {
        let price = self
            .adapter
            .instant_price(token)
            .map_err(AccumulatorError::Fetch)?;
        let liquidity = self
            .adapter
            .instant_liquidity(token)
            .map_err(AccumulatorError::Fetch)?;
        Ok(Observation {
            price,
            token_liquidity: liquidity.token_liquidity,
            quote_token_liquidity: liquidity.quote_token_liquidity,
            timestamp: now,
        })
    }

    /// One upstream's freshness: fine if it does not need an update, or if
    /// its newest accumulation is within heartbeat + grace.
    fn check_upstream(
        &self,
        upstream: Upstream,
        needs_update: bool,
        last_update: Option<u64>,
        max_update_delay: u64,
        token: TokenId,
        now: u64,
    ) -> Result<()> {
        if !needs_update {
            return Ok(());
        }
        let last_update = last_update.ok_or_else(|| OracleError::UpstreamMissing {
            upstream,
            token: short_hex(&token),
        })?;
        let allowed = max_update_delay + self.config.grace;
        if now.saturating_sub(last_update) > allowed {
            return Err(OracleError::UpstreamStale {
                upstream,
                token: short_hex(&token),
                last_update,
                now,
                allowed,
            });
        }
        Ok(())
    }

    fn check_upstreams(&self, token: TokenId, now: u64) -> Result<()> {
        let needs = self
            .price_accumulator
            .needs_update(&self.adapter, token, now)?;
        self.check_upstream(
            Upstream::Price,
            needs,
            self.price_accumulator.last_update_time(token),
            self.price_accumulator.max_update_delay(),
            token,
            now,
        )?;

        let needs = self
            .liquidity_accumulator
            .needs_update(&self.adapter, token, now)?;
        self.check_upstream(
            Upstream::Liquidity,
            needs,
            self.liquidity_accumulator.last_update_time(token),
            self.liquidity_accumulator.max_update_delay(),
            token,
            now,
        )
    }

    fn derive_observation(
        &self,
        old: &AccumulationPair,
        price_now: &PriceAccumulation,
        liquidity_now: &LiquidityAccumulation,
    ) -> Result<Option<Observation>> {
        let Some(price) = time_weighted(
            price_now.price_cumulative,
            old.price.price_cumulative,
            price_now.timestamp,
            old.price.timestamp,
        )?
        else {
            return Ok(None);
        };
        let Some(token_liquidity) = time_weighted(
            liquidity_now.token_liquidity_cumulative,
            old.liquidity.token_liquidity_cumulative,
            liquidity_now.timestamp,
            old.liquidity.timestamp,
        )?
        else {
            return Ok(None);
        };
        let Some(quote_token_liquidity) = time_weighted(
            liquidity_now.quote_token_liquidity_cumulative,
            old.liquidity.quote_token_liquidity_cumulative,
            liquidity_now.timestamp,
            old.liquidity.timestamp,
        )?
        else {
            return Ok(None);
        };
        Ok(Some(Observation {
            price,
            token_liquidity,
            quote_token_liquidity,
            timestamp: price_now.timestamp,
        }))
    }
}

/// Wrapping delta over elapsed time. `Ok(None)` when nothing elapsed and
/// nothing changed; an error when nothing elapsed but the sums differ.
fn time_weighted(cum_new: u128, cum_old: u128, t_new: u64, t_old: u64) -> Result<Option<u128>> {
    if t_new <= t_old {
        if cum_new == cum_old {
            return Ok(None);
        }
        return Err(OracleError::TimeElapsedZero);
    }
    Ok(Some(
        wrapping_delta(cum_new, cum_old) / u128::from(t_new - t_old),
    ))
}

impl<A: PoolAdapter> UpdateableOracle for PeriodicOracle<A> {
    fn needs_update(&self, token: TokenId, now: u64) -> bool {
        match self.observations.latest(&token) {
            Some(observation) => now.saturating_sub(observation.timestamp) >= self.config.period,
            // Building history: pace pair pushes at the same period so a
            // hot caller cannot fill the window with zero-elapsed pairs.
            None => match self.pairs.latest(&token) {
                Some(pair) => now.saturating_sub(pair.price.timestamp) >= self.config.period,
                None => true,
            },
        }
    }

    fn can_update(&self, token: TokenId, now: u64) -> Result<bool> {
        if token == ZERO_TOKEN || token == self.config.quote_token {
            return Ok(false);
        }
        if !self.needs_update(token, now) {
            return Ok(false);
        }
        match self.check_upstreams(token, now) {
            Ok(()) => Ok(true),
            Err(OracleError::UpstreamStale { .. } | OracleError::UpstreamMissing { .. }) => {
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// Returns `Ok(true)` when state advanced: an accumulation pair was
    /// buffered toward the first observation, or an observation was
    /// published. `Ok(false)` before the period elapses, and in the
    /// degenerate case where nothing elapsed since the window-opening pair —
    /// the incoming pair is still buffered then, but the published
    /// observation is untouched.
    fn update(&mut self, token: TokenId, now: u64) -> Result<bool> {
        if token == ZERO_TOKEN || token == self.config.quote_token {
            return Ok(false);
        }
        if !self.needs_update(token, now) {
            return Ok(false);
        }
        self.check_upstreams(token, now)?;

        // Read phase: pull both upstream accumulations before touching any
        // buffer, so a failure leaves this oracle's state untouched.
        let price_now = self
            .price_accumulator
            .current_accumulation(token, now)
            .ok_or_else(|| OracleError::UpstreamMissing {
                upstream: Upstream::Price,
                token: short_hex(&token),
            })?;
        let liquidity_now = self
            .liquidity_accumulator
            .current_accumulation(token, now)
            .ok_or_else(|| OracleError::UpstreamMissing {
                upstream: Upstream::Liquidity,
                token: short_hex(&token),
            })?;

        let granularity = self.config.granularity;
        // The pair exactly `granularity` pushes before the incoming one is
        // read out before the push can overwrite it.
        let window_open = if self.pairs.count(&token) >= granularity {
            Some(*self.pairs.get(&token, granularity - 1)?)
        } else {
            None
        };

        // Commit phase.
        self.pairs.push(
            token,
            AccumulationPair {
                price: price_now,
                liquidity: liquidity_now,
            },
        );

        let Some(old) = window_open else {
            tracing::debug!(
                token = short_hex(&token),
                buffered = self.pairs.count(&token),
                granularity,
                "periodic oracle: building history"
            );
            return Ok(true);
        };

        let Some(observation) = self.derive_observation(&old, &price_now, &liquidity_now)? else {
            return Ok(false);
        };

        self.observations.push(token, observation);
        tracing::info!(
            token = short_hex(&token),
            price = observation.price,
            token_liquidity = observation.token_liquidity,
            quote_token_liquidity = observation.quote_token_liquidity,
            timestamp = observation.timestamp,
            "periodic oracle: observation published"
        );
        self.events.push(OracleEvent::Updated {
            token,
            price: observation.price,
            token_liquidity: observation.token_liquidity,
            quote_token_liquidity: observation.quote_token_liquidity,
            timestamp: observation.timestamp,
        });
        Ok(true)
    }
}

impl<A: PoolAdapter> PriceOracle for PeriodicOracle<A> {
    fn consult_price(&self, token: TokenId, now: u64) -> Result<u128> {
        Ok(self.consult(token, now)?.price)
    }

    fn consult_price_with_max_age(&self, token: TokenId, now: u64, max_age: u64) -> Result<u128> {
        Ok(self.consult_with_max_age(token, now, max_age)?.price)
    }
}

impl<A: PoolAdapter> LiquidityOracle for PeriodicOracle<A> {
    fn consult_liquidity(&self, token: TokenId, now: u64) -> Result<(u128, u128)> {
        let observation = self.consult(token, now)?;
        Ok((observation.token_liquidity, observation.quote_token_liquidity))
    }

    fn consult_liquidity_with_max_age(
        &self,
        token: TokenId,
        now: u64,
        max_age: u64,
    ) -> Result<(u128, u128)> {
        let observation = self.consult_with_max_age(token, now, max_age)?;
        Ok((observation.token_liquidity, observation.quote_token_liquidity))
    }
}

impl<A: PoolAdapter> Oracle for PeriodicOracle<A> {
    fn consult(&self, token: TokenId, now: u64) -> Result<Observation> {
        if token == self.config.quote_token {
            return self.identity_observation(now);
        }
        self.stored_observation(token)
    }

    fn consult_with_max_age(&self, token: TokenId, now: u64, max_age: u64) -> Result<Observation> {
        if token == self.config.quote_token {
            return self.identity_observation(now);
        }
        if max_age == 0 {
            return self.live_observation(token, now);
        }
        let observation = self.stored_observation(token)?;
        check_age(&observation, now, max_age)?;
        Ok(observation)
    }

    fn quote_token(&self) -> TokenId {
        self.config.quote_token
    }

    fn price_decimals(&self) -> u8 {
        self.config.price_decimals
    }

    fn liquidity_decimals(&self) -> u8 {
        self.config.liquidity_decimals
    }
}

impl<A: PoolAdapter> HistoricalOracle for PeriodicOracle<A> {
    fn observation_at(&self, token: TokenId, index: u16) -> Result<Observation> {
        Ok(*self.observations.get(&token, index)?)
    }

    fn observations_count(&self, token: TokenId) -> u16 {
        self.observations.count(&token)
    }

    fn observations_capacity(&self, token: TokenId) -> u16 {
        self.observations.capacity(&token)
    }

    fn observations_range(
        &self,
        token: TokenId,
        amount: u16,
        offset: u16,
        increment: u16,
    ) -> Result<Vec<Observation>> {
        Ok(self.observations.get_range(&token, amount, offset, increment)?)
    }

    fn set_observations_capacity(&mut self, token: TokenId, capacity: u16) -> Result<()> {
        let (old_capacity, new_capacity) = self.observations.set_capacity(token, capacity)?;
        tracing::info!(
            token = short_hex(&token),
            old_capacity,
            new_capacity,
            "periodic oracle: observation capacity increased"
        );
        self.events.push(OracleEvent::ObservationCapacityIncreased {
            token,
            old_capacity,
            new_capacity,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_accumulator::{stub::StubPoolAdapter, PoolLiquidity};

    const TOKEN: TokenId = [0x11; 20];
    const QUOTE: TokenId = [0xff; 20];

    fn oracle_config(period: u64, granularity: u16) -> OracleConfig {
        OracleConfig {
            period,
            granularity,
            grace: DEFAULT_GRACE,
            price_decimals: 8,
            liquidity_decimals: 0,
            quote_token: QUOTE,
        }
    }

    fn accumulator_config() -> AccumulatorConfig {
        // 2% threshold, no delay, 5 minute heartbeat.
        AccumulatorConfig::new(2_000_000, 0, 300).expect("config")
    }

    fn adapter_with(price: u128, token_liquidity: u128, quote_liquidity: u128) -> StubPoolAdapter {
        let mut adapter = StubPoolAdapter::new();
        adapter.set_price(TOKEN, price);
        adapter.set_liquidity(
            TOKEN,
            PoolLiquidity {
                token_liquidity,
                quote_token_liquidity: quote_liquidity,
            },
        );
        adapter
    }

    fn oracle(period: u64, granularity: u16) -> PeriodicOracle<StubPoolAdapter> {
        PeriodicOracle::new(
            oracle_config(period, granularity),
            accumulator_config(),
            adapter_with(500, 1_000, 2_000),
        )
        .expect("oracle")
    }

    /// Drive accumulators and the oracle at `now`.
    fn tick(oracle: &mut PeriodicOracle<StubPoolAdapter>, now: u64) -> bool {
        oracle
            .update_accumulators(TOKEN, now)
            .expect("accumulators");
        oracle.update(TOKEN, now).expect("update")
    }

    #[test]
    fn test_config_rejects_zero_period() {
        let mut config = oracle_config(0, 1);
        config.period = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPeriod)));
    }

    #[test]
    fn test_config_rejects_zero_granularity() {
        let config = oracle_config(60, 0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroGranularity)));
    }

    #[test]
    fn test_config_rejects_period_not_multiple() {
        let config = oracle_config(100, 3);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PeriodNotMultipleOfGranularity { period: 100, granularity: 3 })
        ));
    }

    #[test]
    fn test_state_machine_progression() {
        let mut oracle = oracle(100, 2);
        assert_eq!(oracle.state(TOKEN), OracleState::Uninitialized);

        assert!(tick(&mut oracle, 1000));
        assert_eq!(
            oracle.state(TOKEN),
            OracleState::PartialHistory { buffered: 1, granularity: 2 }
        );

        assert!(tick(&mut oracle, 1100));
        assert_eq!(
            oracle.state(TOKEN),
            OracleState::PartialHistory { buffered: 2, granularity: 2 }
        );

        // Third update finds a pair exactly two pushes back.
        assert!(tick(&mut oracle, 1200));
        assert_eq!(oracle.state(TOKEN), OracleState::Active);
    }

    #[test]
    fn test_constant_price_twap_is_exact() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100);

        let observation = oracle.consult(TOKEN, 1100).expect("observation");
        assert_eq!(observation.price, 500);
        assert_eq!(observation.token_liquidity, 1_000);
        assert_eq!(observation.quote_token_liquidity, 2_000);
        assert_eq!(observation.timestamp, 1100);
    }

    #[test]
    fn test_twap_averages_over_window() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100); // first observation at price 500

        // Price moves to 700; accumulators commit the change at 1150, so
        // the window [1100, 1200) held 500 for 50s and 700 for 50s.
        oracle.adapter_mut().set_price(TOKEN, 700);
        oracle.update_accumulators(TOKEN, 1150).expect("mid-window");
        tick(&mut oracle, 1200);

        let observation = oracle.consult(TOKEN, 1200).expect("observation");
        assert_eq!(observation.price, 600);
    }

    #[test]
    fn test_update_is_idempotent_within_period() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100);
        assert!(oracle.needs_update(TOKEN, 1100 + 100));
        assert!(!oracle.needs_update(TOKEN, 1100 + 99));
        assert!(!oracle.update(TOKEN, 1100 + 99).expect("gated no-op"));
    }

    #[test]
    fn test_partial_history_is_period_paced() {
        let mut oracle = oracle(100, 2);
        tick(&mut oracle, 1000);
        // A second call inside the period must not buffer another pair.
        assert!(!oracle.update(TOKEN, 1050).expect("paced"));
        assert_eq!(
            oracle.state(TOKEN),
            OracleState::PartialHistory { buffered: 1, granularity: 2 }
        );
    }

    #[test]
    fn test_consult_missing_observation() {
        let oracle = oracle(100, 1);
        let err = oracle.consult(TOKEN, 1000).expect_err("no observation");
        assert!(matches!(err, OracleError::MissingObservation { .. }));
    }

    #[test]
    fn test_consult_max_age_boundary() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100);

        // Age exactly equal to the maximum is accepted.
        assert!(oracle
            .consult_with_max_age(TOKEN, 1100 + 60, 60)
            .is_ok());
        let err = oracle
            .consult_with_max_age(TOKEN, 1100 + 61, 60)
            .expect_err("too old");
        assert!(matches!(err, OracleError::RateTooOld { age: 61, max_age: 60 }));
    }

    #[test]
    fn test_consult_max_age_zero_reads_live() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100);

        oracle.adapter_mut().set_price(TOKEN, 900);
        let live = oracle
            .consult_with_max_age(TOKEN, 1100, 0)
            .expect("live read");
        assert_eq!(live.price, 900);

        // The stored observation is unaffected.
        let stored = oracle.consult(TOKEN, 1100).expect("stored");
        assert_eq!(stored.price, 500);
    }

    #[test]
    fn test_quote_token_identity() {
        let oracle = oracle(100, 1);
        let observation = oracle.consult(QUOTE, 1234).expect("identity");
        assert_eq!(observation.price, 100_000_000); // one unit at 8 decimals
        assert_eq!(observation.token_liquidity, 0);
        assert_eq!(observation.quote_token_liquidity, 0);
        assert_eq!(observation.timestamp, 1234);

        // Identity bypasses staleness entirely.
        assert!(oracle.consult_with_max_age(QUOTE, 1234, 1).is_ok());
    }

    #[test]
    fn test_update_without_accumulator_history_names_upstream() {
        let mut oracle = oracle(100, 1);
        let err = oracle.update(TOKEN, 1000).expect_err("missing upstream");
        assert!(matches!(
            err,
            OracleError::UpstreamMissing { upstream: Upstream::Price, .. }
        ));
        assert!(!oracle.can_update(TOKEN, 1000).expect("can_update"));
    }

    #[test]
    fn test_stale_upstream_fails_update() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100);

        // The pool pauses; the accumulators' newest commits stay at 1000.
        oracle.adapter_mut().set_venue_paused(true);
        oracle
            .update_accumulators(TOKEN, 2000)
            .expect("paused no-op");

        // Staleness is tolerated up to heartbeat + grace past the last
        // commit; at the boundary the oracle may still update on
        // extrapolated accumulations.
        let boundary = 1000 + 300 + DEFAULT_GRACE;
        assert!(oracle.can_update(TOKEN, boundary).expect("within grace"));

        // One second further the update fails, naming the upstream that
        // went dark.
        let beyond = boundary + 1;
        let err = oracle.update(TOKEN, beyond).expect_err("stale upstream");
        assert!(matches!(
            err,
            OracleError::UpstreamStale { upstream: Upstream::Price, .. }
        ));
        assert!(!oracle.can_update(TOKEN, beyond).expect("can_update"));
    }

    #[test]
    fn test_zero_and_quote_token_updates_are_noops() {
        let mut oracle = oracle(100, 1);
        assert!(!oracle.update(ZERO_TOKEN, 1000).expect("zero token"));
        assert!(!oracle.update(QUOTE, 1000).expect("quote token"));
    }

    #[test]
    fn test_updated_event_recorded() {
        let mut oracle = oracle(100, 1);
        tick(&mut oracle, 1000);
        tick(&mut oracle, 1100);

        let events = oracle.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            OracleEvent::Updated { token, price: 500, .. } if *token == TOKEN
        )));
        assert!(oracle.take_events().is_empty(), "drained");
    }

    #[test]
    fn test_capacity_admin_records_events() {
        let mut oracle = oracle(100, 2);
        oracle
            .set_accumulations_capacity(TOKEN, 8)
            .expect("grow pairs");
        oracle
            .set_observations_capacity(TOKEN, 4)
            .expect("grow observations");

        let events = oracle.take_events();
        assert!(events.contains(&OracleEvent::AccumulationCapacityIncreased {
            token: TOKEN,
            old_capacity: 2,
            new_capacity: 8,
        }));
        assert!(events.contains(&OracleEvent::ObservationCapacityIncreased {
            token: TOKEN,
            old_capacity: 1,
            new_capacity: 4,
        }));

        let err = oracle
            .set_observations_capacity(TOKEN, 4)
            .expect_err("not strictly larger");
        assert!(matches!(err, OracleError::Store(_)));
    }

    #[test]
    fn test_observation_history_grows_with_capacity() {
        let mut oracle = oracle(100, 1);
        oracle
            .set_observations_capacity(TOKEN, 3)
            .expect("grow observations");

        tick(&mut oracle, 1000);
        for step in 1..=4u64 {
            tick(&mut oracle, 1000 + step * 100);
        }
        assert_eq!(oracle.observations_count(TOKEN), 3);
        let newest = oracle.observation_at(TOKEN, 0).expect("newest");
        let range = oracle
            .observations_range(TOKEN, 3, 0, 1)
            .expect("range");
        assert_eq!(range[0], newest);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_time_weighted_zero_elapsed() {
        assert_eq!(time_weighted(10, 10, 100, 100).expect("no change"), None);
        assert!(matches!(
            time_weighted(11, 10, 100, 100),
            Err(OracleError::TimeElapsedZero)
        ));
        assert_eq!(time_weighted(1000, 500, 200, 100).expect("twap"), Some(5));
    }

    #[test]
    fn test_time_weighted_across_wrap() {
        let old = u128::MAX - 499;
        let new = 500u128;
        // Delta is 1000 over 100 seconds.
        assert_eq!(time_weighted(new, old, 200, 100).expect("twap"), Some(10));
    }
}
