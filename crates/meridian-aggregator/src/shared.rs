//! Shared oracle handles.
//!
//! An aggregation holds its sources, but the sources still need their own
//! keeper driving updates. [`SharedOracle`] is a cheaply-cloneable handle
//! over one oracle: one clone goes into the aggregation's source list, the
//! other stays with the keeper. Execution is single-threaded and
//! transactional, so plain interior mutability is enough — consultations
//! borrow shared, updates borrow exclusively, and neither outlives its
//! call.

use std::cell::RefCell;
use std::rc::Rc;

use meridian_oracle::{
    HistoricalOracle, LiquidityOracle, Oracle, PriceOracle, Result, UpdateableOracle,
};
use meridian_types::{observation::Observation, TokenId};

/// A cloneable handle to an oracle shared between a keeper and any number
/// of aggregations.
pub struct SharedOracle<O> {
    inner: Rc<RefCell<O>>,
}

impl<O> SharedOracle<O> {
    /// Wrap an oracle in a shared handle.
    pub fn new(oracle: O) -> Self {
        Self {
            inner: Rc::new(RefCell::new(oracle)),
        }
    }

    /// Run `f` with exclusive access to the wrapped oracle.
    pub fn with_mut<T>(&self, f: impl FnOnce(&mut O) -> T) -> T {
        f(&mut self.inner.borrow_mut())
    }
}

impl<O> Clone for SharedOracle<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O: PriceOracle> PriceOracle for SharedOracle<O> {
    fn consult_price(&self, token: TokenId, now: u64) -> Result<u128> {
        self.inner.borrow().consult_price(token, now)
    }

    fn consult_price_with_max_age(&self, token: TokenId, now: u64, max_age: u64) -> Result<u128> {
        self.inner.borrow().consult_price_with_max_age(token, now, max_age)
    }
}

impl<O: LiquidityOracle> LiquidityOracle for SharedOracle<O> {
    fn consult_liquidity(&self, token: TokenId, now: u64) -> Result<(u128, u128)> {
        self.inner.borrow().consult_liquidity(token, now)
    }

    fn consult_liquidity_with_max_age(
        &self,
        token: TokenId,
        now: u64,
        max_age: u64,
    ) -> Result<(u128, u128)> {
        self.inner
            .borrow()
            .consult_liquidity_with_max_age(token, now, max_age)
    }
}

impl<O: Oracle> Oracle for SharedOracle<O> {
    fn consult(&self, token: TokenId, now: u64) -> Result<Observation> {
        self.inner.borrow().consult(token, now)
    }

    fn consult_with_max_age(&self, token: TokenId, now: u64, max_age: u64) -> Result<Observation> {
        self.inner.borrow().consult_with_max_age(token, now, max_age)
    }

    fn quote_token(&self) -> TokenId {
        self.inner.borrow().quote_token()
    }

    fn price_decimals(&self) -> u8 {
        self.inner.borrow().price_decimals()
    }

    fn liquidity_decimals(&self) -> u8 {
        self.inner.borrow().liquidity_decimals()
    }
}

impl<O: UpdateableOracle> UpdateableOracle for SharedOracle<O> {
    fn needs_update(&self, token: TokenId, now: u64) -> bool {
        self.inner.borrow().needs_update(token, now)
    }

    fn can_update(&self, token: TokenId, now: u64) -> Result<bool> {
        self.inner.borrow().can_update(token, now)
    }

    fn update(&mut self, token: TokenId, now: u64) -> Result<bool> {
        self.inner.borrow_mut().update(token, now)
    }
}

impl<O: HistoricalOracle> HistoricalOracle for SharedOracle<O> {
    fn observation_at(&self, token: TokenId, index: u16) -> Result<Observation> {
        self.inner.borrow().observation_at(token, index)
    }

    fn observations_count(&self, token: TokenId) -> u16 {
        self.inner.borrow().observations_count(token)
    }

    fn observations_capacity(&self, token: TokenId) -> u16 {
        self.inner.borrow().observations_capacity(token)
    }

    fn observations_range(
        &self,
        token: TokenId,
        amount: u16,
        offset: u16,
        increment: u16,
    ) -> Result<Vec<Observation>> {
        self.inner
            .borrow()
            .observations_range(token, amount, offset, increment)
    }

    fn set_observations_capacity(&mut self, token: TokenId, capacity: u16) -> Result<()> {
        self.inner.borrow_mut().set_observations_capacity(token, capacity)
    }
}
