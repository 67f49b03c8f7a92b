//! The aggregated oracle.
//!
//! Holds a fixed list of named sources behind `Box<dyn Oracle>` and, once
//! per period, folds their observations into one. Sources are consulted
//! strictly sequentially; a failing or rejected source is excluded and
//! recorded as an [`OracleEvent::UpdateError`] naming it, and the update
//! proceeds with whatever survives. Only an empty survivor set fails the
//! update.

use std::collections::HashSet;

use meridian_math::decimal::{rescale, rescale_saturating};
use meridian_store::HistoryStore;
use meridian_types::{
    events::OracleEvent, observation::Observation, short_hex, TokenId, ZERO_TOKEN,
};

use meridian_oracle::{
    ConfigError, HistoricalOracle, LiquidityOracle, Oracle, OracleError, PriceOracle, Result,
    UpdateableOracle,
};

use crate::mean::weighted_harmonic_mean;
use crate::validation::{self, ValidationConfig};

/// One upstream oracle with the name failures are reported under.
pub struct AggregatorSource {
    /// Unique name, used for duplicate detection and error events.
    pub name: String,
    /// The source oracle; aggregations nest, so this may itself be an
    /// [`AggregatedOracle`].
    pub oracle: Box<dyn Oracle>,
}

impl AggregatorSource {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, oracle: Box<dyn Oracle>) -> Self {
        Self {
            name: name.into(),
            oracle,
        }
    }
}

/// Parameters of an aggregation.
#[derive(Clone, Copy, Debug)]
pub struct AggregationConfig {
    /// The denominator asset all prices are expressed in.
    pub quote_token: TokenId,
    /// Decimal precision of aggregated prices.
    pub price_decimals: u8,
    /// Decimal precision of aggregated liquidity values.
    pub liquidity_decimals: u8,
    /// Minimum seconds between published aggregated observations.
    pub period: u64,
    /// Maximum age accepted from a source during an update; a stalled
    /// source past this is excluded rather than allowed to drag old data
    /// into a fresh aggregate.
    pub max_source_age: u64,
    /// Per-source liquidity-quality thresholds.
    pub validation: ValidationConfig,
}

/// A rescaled, validated source consultation.
#[derive(Clone, Copy, Debug)]
struct Consultation {
    price: u128,
    token_liquidity: u128,
    quote_token_liquidity: u128,
}

/// Merges observations from independent source oracles.
pub struct AggregatedOracle {
    config: AggregationConfig,
    sources: Vec<AggregatorSource>,
    observations: HistoryStore<Observation>,
    events: Vec<OracleEvent>,
}

impl AggregatedOracle {
    /// Build an aggregation over `sources`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroPeriod`], [`ConfigError::EmptySources`],
    ///   [`ConfigError::DuplicateSource`]
    pub fn new(
        config: AggregationConfig,
        sources: Vec<AggregatorSource>,
    ) -> std::result::Result<Self, ConfigError> {
        if config.period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if sources.is_empty() {
            return Err(ConfigError::EmptySources);
        }
        let mut names = HashSet::new();
        for source in &sources {
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
        }
        Ok(Self {
            config,
            sources,
            observations: HistoryStore::new(1),
            events: Vec::new(),
        })
    }

    /// The aggregation's configuration.
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Names of the configured sources, in consultation order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Consult every source, rescale to the aggregation's decimals, and
    /// validate. Exclusions are returned as events for the caller to keep
    /// or drop; errors abort only for arithmetic the price path cannot
    /// clamp.
    fn gather(
        &self,
        token: TokenId,
        now: u64,
        max_age: u64,
    ) -> Result<(Vec<Consultation>, Vec<OracleEvent>)> {
        let mut valid = Vec::with_capacity(self.sources.len());
        let mut events = Vec::new();

        for source in &self.sources {
            let observation = match source.oracle.consult_with_max_age(token, now, max_age) {
                Ok(observation) => observation,
                Err(err) => {
                    tracing::warn!(
                        source = source.name.as_str(),
                        token = short_hex(&token),
                        error = %err,
                        "aggregation: source consultation failed"
                    );
                    events.push(OracleEvent::UpdateError {
                        source: source.name.clone(),
                        token,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let price = rescale(
                observation.price,
                source.oracle.price_decimals(),
                self.config.price_decimals,
            )
            .ok_or(OracleError::ArithmeticOverflow {
                context: "price rescaling",
            })?;
            let candidate = Consultation {
                price,
                token_liquidity: rescale_saturating(
                    observation.token_liquidity,
                    source.oracle.liquidity_decimals(),
                    self.config.liquidity_decimals,
                ),
                quote_token_liquidity: rescale_saturating(
                    observation.quote_token_liquidity,
                    source.oracle.liquidity_decimals(),
                    self.config.liquidity_decimals,
                ),
            };

            let as_observation = Observation {
                price: candidate.price,
                token_liquidity: candidate.token_liquidity,
                quote_token_liquidity: candidate.quote_token_liquidity,
                timestamp: observation.timestamp,
            };
            if let Err(reason) = validation::validate(
                &as_observation,
                self.config.price_decimals,
                &self.config.validation,
            ) {
                tracing::warn!(
                    source = source.name.as_str(),
                    token = short_hex(&token),
                    reason = %reason,
                    "aggregation: source rejected by validation"
                );
                events.push(OracleEvent::UpdateError {
                    source: source.name.clone(),
                    token,
                    reason: reason.to_string(),
                });
                continue;
            }

            valid.push(candidate);
        }

        Ok((valid, events))
    }

    /// Combine validated consultations into one observation stamped `now`.
    fn combine(&self, valid: &[Consultation], token: TokenId, now: u64) -> Result<Observation> {
        if valid.is_empty() {
            return Err(OracleError::NoValidConsultations {
                token: short_hex(&token),
            });
        }

        let entries: Vec<(u128, u128)> = valid
            .iter()
            .map(|c| (c.price, c.quote_token_liquidity))
            .collect();
        let price =
            weighted_harmonic_mean(&entries).ok_or(OracleError::ArithmeticOverflow {
                context: "price combination",
            })?;

        // Liquidity totals clamp; depth past the representable maximum is
        // still "as deep as we can say".
        let token_liquidity = valid
            .iter()
            .fold(0u128, |sum, c| sum.saturating_add(c.token_liquidity));
        let quote_token_liquidity = valid
            .iter()
            .fold(0u128, |sum, c| sum.saturating_add(c.quote_token_liquidity));

        Ok(Observation {
            price,
            token_liquidity,
            quote_token_liquidity,
            timestamp: now,
        })
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

    /// Aggregate the sources' live values without touching storage.
    fn live_observation(&self, token: TokenId, now: u64) -> Result<Observation> {
        let (valid, _events) = self.gather(token, now, 0)?;
        self.combine(&valid, token, now)
    }
}

impl UpdateableOracle for AggregatedOracle {
    fn needs_update(&self, token: TokenId, now: u64) -> bool {
        match self.observations.latest(&token) {
            Some(observation) => now.saturating_sub(observation.timestamp) >= self.config.period,
            None => true,
        }
    }

    fn can_update(&self, token: TokenId, now: u64) -> Result<bool> {
        if token == ZERO_TOKEN || token == self.config.quote_token {
            return Ok(false);
        }
        Ok(self.needs_update(token, now))
    }

    fn update(&mut self, token: TokenId, now: u64) -> Result<bool> {
        if token == ZERO_TOKEN || token == self.config.quote_token {
            return Ok(false);
        }
        if !self.needs_update(token, now) {
            return Ok(false);
        }

        // Read phase: all source consultations complete before any local
        // state changes; the exclusion events are kept even if combining
        // fails, so a total outage is still attributable per source.
        let (valid, events) = self.gather(token, now, self.config.max_source_age)?;
        self.events.extend(events);
        let observation = self.combine(&valid, token, now)?;

        self.observations.push(token, observation);
        tracing::info!(
            token = short_hex(&token),
            price = observation.price,
            token_liquidity = observation.token_liquidity,
            quote_token_liquidity = observation.quote_token_liquidity,
            sources_used = valid.len(),
            sources_total = self.sources.len(),
            "aggregation: observation published"
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

impl PriceOracle for AggregatedOracle {
    fn consult_price(&self, token: TokenId, now: u64) -> Result<u128> {
        Ok(self.consult(token, now)?.price)
    }

    fn consult_price_with_max_age(&self, token: TokenId, now: u64, max_age: u64) -> Result<u128> {
        Ok(self.consult_with_max_age(token, now, max_age)?.price)
    }
}

impl LiquidityOracle for AggregatedOracle {
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

impl Oracle for AggregatedOracle {
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
        let age = now.saturating_sub(observation.timestamp);
        if age > max_age {
            return Err(OracleError::RateTooOld { age, max_age });
        }
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

impl HistoricalOracle for AggregatedOracle {
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
            "aggregation: observation capacity increased"
        );
        self.events.push(OracleEvent::ObservationCapacityIncreased {
            token,
            old_capacity,
            new_capacity,
        });
        Ok(())
    }
}
