//! Update gating rules.
//!
//! A snapshot may be committed when any of the following holds, checked in
//! order so that external reads happen only when the cheap time checks do
//! not already decide:
//!
//! 1. no prior snapshot exists for the token;
//! 2. at least `heartbeat` seconds elapsed since the last snapshot;
//! 3. at least `update_delay` seconds elapsed AND the instantaneous value
//!    moved by at least `update_threshold` relative to the last committed
//!    reading.

use meridian_types::CHANGE_PRECISION;

use crate::ConfigError;

/// Gating parameters shared by all accumulators.
#[derive(Clone, Copy, Debug)]
pub struct AccumulatorConfig {
    /// Minimum relative change (at [`CHANGE_PRECISION`] scale) for a
    /// threshold-driven update.
    pub update_threshold: u128,
    /// Minimum seconds between threshold-driven updates.
    pub update_delay: u64,
    /// Maximum seconds between updates regardless of value change.
    pub heartbeat: u64,
}

impl AccumulatorConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroHeartbeat`] if `heartbeat` is zero
    /// - [`ConfigError::DelayExceedsHeartbeat`] if `update_delay > heartbeat`
    pub fn new(
        update_threshold: u128,
        update_delay: u64,
        heartbeat: u64,
    ) -> Result<Self, ConfigError> {
        if heartbeat == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }
        if update_delay > heartbeat {
            return Err(ConfigError::DelayExceedsHeartbeat {
                update_delay,
                heartbeat,
            });
        }
        Ok(Self {
            update_threshold,
            update_delay,
            heartbeat,
        })
    }
}

/// Whether the heartbeat forces an update regardless of value change.
pub fn heartbeat_due(last_timestamp: u64, now: u64, heartbeat: u64) -> bool {
    now.saturating_sub(last_timestamp) >= heartbeat
}

/// Whether enough time has passed for a threshold-driven update.
pub fn delay_satisfied(last_timestamp: u64, now: u64, update_delay: u64) -> bool {
    now.saturating_sub(last_timestamp) >= update_delay
}

/// Whether the value moved enough relative to the last committed reading.
pub fn change_threshold_surpassed(current: u128, previous: u128, threshold: u128) -> bool {
    meridian_math::relative_change(current, previous, CHANGE_PRECISION) >= threshold
}
