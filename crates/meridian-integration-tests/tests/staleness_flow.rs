//! Integration test: staleness handling across the whole stack.
//!
//! A venue going dark is tolerated in stages: first the periodic oracle
//! keeps publishing on extrapolated accumulations, then — past heartbeat
//! plus grace — its updates fail naming the dead upstream, then the
//! aggregation drops the stale source, and finally consumers see the
//! distinguishable terminal errors.

use meridian_accumulator::{AccumulatorConfig, PoolLiquidity, StubPoolAdapter};
use meridian_aggregator::{
    AggregatedOracle, AggregationConfig, AggregatorSource, SharedOracle, ValidationConfig,
};
use meridian_oracle::{
    Oracle, OracleConfig, OracleError, PeriodicOracle, PriceOracle, UpdateableOracle, Upstream,
};
use meridian_types::{events::OracleEvent, TokenId};

const T0: u64 = 1_700_000_000;
const TOKEN: TokenId = [0x11; 20];
const QUOTE: TokenId = [0xff; 20];
const PERIOD: u64 = 60;
const HEARTBEAT: u64 = 300;
const GRACE: u64 = 600;

fn periodic_oracle(price: u128) -> SharedOracle<PeriodicOracle<StubPoolAdapter>> {
    let mut adapter = StubPoolAdapter::new();
    adapter.set_price(TOKEN, price);
    adapter.set_liquidity(
        TOKEN,
        PoolLiquidity {
            token_liquidity: 1_000,
            quote_token_liquidity: 500,
        },
    );
    let config = OracleConfig {
        period: PERIOD,
        granularity: 1,
        grace: GRACE,
        price_decimals: 2,
        liquidity_decimals: 0,
        quote_token: QUOTE,
    };
    let accumulator_config =
        AccumulatorConfig::new(2_000_000, 0, HEARTBEAT).expect("accumulator config");
    SharedOracle::new(
        PeriodicOracle::new(config, accumulator_config, adapter).expect("oracle"),
    )
}

fn tick(oracle: &SharedOracle<PeriodicOracle<StubPoolAdapter>>, now: u64) {
    oracle.with_mut(|o| {
        o.update_accumulators(TOKEN, now).expect("accumulators");
        o.update(TOKEN, now).expect("oracle update");
    });
}

#[test]
fn venue_outage_degrades_in_stages() {
    // =========================================================
    // Step 1: two healthy venues feeding an aggregation
    // =========================================================
    let venue_a = periodic_oracle(100);
    let venue_b = periodic_oracle(300);
    let mut aggregated = AggregatedOracle::new(
        AggregationConfig {
            quote_token: QUOTE,
            price_decimals: 2,
            liquidity_decimals: 0,
            period: PERIOD,
            max_source_age: PERIOD,
            validation: ValidationConfig::default(),
        },
        vec![
            AggregatorSource::new("venue-a", Box::new(venue_a.clone())),
            AggregatorSource::new("venue-b", Box::new(venue_b.clone())),
        ],
    )
    .expect("aggregated oracle");

    tick(&venue_a, T0);
    tick(&venue_b, T0);
    tick(&venue_a, T0 + PERIOD);
    tick(&venue_b, T0 + PERIOD);
    aggregated.update(TOKEN, T0 + PERIOD).expect("both healthy");
    // Harmonic mean of 1.00 and 3.00 at equal weight: 2/(1 + 1/3) = 1.50.
    assert_eq!(
        aggregated.consult_price(TOKEN, T0 + PERIOD).expect("price"),
        150
    );
    aggregated.take_events();

    // =========================================================
    // Step 2: venue B goes dark; its periodic oracle coasts on
    // extrapolated accumulations inside heartbeat + grace
    // =========================================================
    venue_b.with_mut(|o| o.adapter_mut().set_venue_paused(true));

    let t2 = T0 + 2 * PERIOD;
    tick(&venue_a, t2);
    tick(&venue_b, t2); // accumulators no-op, oracle still derives
    assert_eq!(venue_b.consult(TOKEN, t2).expect("coasting").price, 300);

    aggregated.update(TOKEN, t2).expect("still both");
    assert_eq!(aggregated.consult_price(TOKEN, t2).expect("price"), 150);

    // =========================================================
    // Step 3: past heartbeat + grace, venue B's update fails and
    // names the dead upstream
    // =========================================================
    let t_dead = T0 + HEARTBEAT + GRACE + PERIOD;
    let err = venue_b
        .with_mut(|o| o.update(TOKEN, t_dead))
        .expect_err("stale upstream");
    assert!(matches!(
        err,
        OracleError::UpstreamStale { upstream: Upstream::Price, .. }
    ));
    assert!(!venue_b
        .with_mut(|o| o.can_update(TOKEN, t_dead))
        .expect("can_update"));

    // =========================================================
    // Step 4: the aggregation drops the stale source and carries on
    // with the healthy one
    // =========================================================
    tick(&venue_a, t_dead);
    aggregated.update(TOKEN, t_dead).expect("degraded");
    assert_eq!(
        aggregated.consult_price(TOKEN, t_dead).expect("price"),
        100,
        "only venue A remains in the aggregate"
    );
    let events = aggregated.take_events();
    assert!(
        events.iter().any(|e| matches!(
            e,
            OracleEvent::UpdateError { source, .. } if source == "venue-b"
        )),
        "the excluded source must be named"
    );

    // =========================================================
    // Step 5: both dark — nothing valid remains
    // =========================================================
    venue_a.with_mut(|o| o.adapter_mut().set_venue_paused(true));
    let t_all_dead = t_dead + 10 * PERIOD;
    let err = aggregated
        .update(TOKEN, t_all_dead)
        .expect_err("no valid consultations");
    assert!(matches!(err, OracleError::NoValidConsultations { .. }));

    // The last good aggregate is still consultable without an age bound,
    // and distinguishably too old with one.
    assert_eq!(
        aggregated.consult_price(TOKEN, t_all_dead).expect("stored"),
        100
    );
    assert!(matches!(
        aggregated.consult_price_with_max_age(TOKEN, t_all_dead, PERIOD),
        Err(OracleError::RateTooOld { .. })
    ));
}

#[test]
fn consult_errors_are_distinguishable() {
    let venue = periodic_oracle(100);

    // No data yet: MissingObservation.
    assert!(matches!(
        venue.consult(TOKEN, T0),
        Err(OracleError::MissingObservation { .. })
    ));

    tick(&venue, T0);
    tick(&venue, T0 + PERIOD);

    // Data too old: RateTooOld, with the boundary age accepted.
    let published = T0 + PERIOD;
    venue
        .consult_with_max_age(TOKEN, published + 30, 30)
        .expect("exactly at the bound");
    assert!(matches!(
        venue.consult_with_max_age(TOKEN, published + 31, 30),
        Err(OracleError::RateTooOld { age: 31, max_age: 30 })
    ));

    // Live reads bypass staleness entirely.
    venue.with_mut(|o| o.adapter_mut().set_price(TOKEN, 555));
    assert_eq!(
        venue
            .consult_with_max_age(TOKEN, published + 31, 0)
            .expect("live")
            .price,
        555
    );
}
