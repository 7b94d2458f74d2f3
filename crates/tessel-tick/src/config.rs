//! Tick loop configuration.

use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the tick rate in Hz.
pub const TICK_RATE_VAR: &str = "TESSEL_TICK_RATE";

/// Environment variable holding the number of ticks to run before stopping.
pub const MAX_TICKS_VAR: &str = "TESSEL_MAX_TICKS";

/// Tick configuration error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickError {
    /// An environment variable held something unparsable.
    #[error("invalid {var}={value:?}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// Tick rate is zero, negative or not finite.
    #[error("tick rate must be a positive finite number of Hz, got {0}")]
    InvalidRate(f64),
}

/// Result type for tick configuration.
pub type TickResult<T> = Result<T, TickError>;

/// Fixed-timestep settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickConfig {
    /// Ticks per second.
    tick_rate: f64,
    /// Stop after this many ticks; `None` runs until stopped.
    max_ticks: Option<u64>,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: None,
        }
    }
}

impl TickConfig {
    pub fn new(tick_rate: f64) -> TickResult<Self> {
        if !tick_rate.is_finite() || tick_rate <= 0.0 {
            return Err(TickError::InvalidRate(tick_rate));
        }
        Ok(Self {
            tick_rate,
            max_ticks: None,
        })
    }

    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Read `TESSEL_TICK_RATE` and `TESSEL_MAX_TICKS`, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> TickResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TickResult<Self> {
        let defaults = Self::default();

        let tick_rate = match lookup(TICK_RATE_VAR) {
            Some(value) => parse(TICK_RATE_VAR, &value)?,
            None => defaults.tick_rate,
        };
        let max_ticks = match lookup(MAX_TICKS_VAR) {
            Some(value) => Some(parse(MAX_TICKS_VAR, &value)?),
            None => defaults.max_ticks,
        };

        Ok(Self::new(tick_rate)?.with_max_ticks(max_ticks))
    }

    #[must_use]
    pub const fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    #[must_use]
    pub const fn max_ticks(&self) -> Option<u64> {
        self.max_ticks
    }

    /// Simulated seconds per tick, fed to every update system.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.tick_rate.recip()
    }

    /// Wall-clock budget for one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.delta())
    }
}

fn parse<T>(var: &'static str, value: &str) -> TickResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| TickError::InvalidEnv {
        var,
        value: value.to_owned(),
        reason: err.to_string(),
    })
}
