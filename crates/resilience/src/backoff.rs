//! Spacing between consistency probes
//!
//! The wait between probes starts at the poller's minimum interval. While the
//! remote side keeps reporting a pending state the wait grows according to
//! [`PollBackoff`]; once a target streak begins it is held steady so the
//! streak is sampled at an even cadence. [`JitterPolicy`] spreads concurrent
//! pollers apart, but never below the minimum interval.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default ceiling for exponential growth between probes.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);

/// How the wait between probes evolves while the state is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollBackoff {
    /// Always wait the minimum interval.
    Fixed,
    /// Multiply the wait after every pending observation, up to `max_interval`.
    Exponential {
        /// Growth factor applied after each pending observation
        multiplier: f64,
        /// Upper bound for a single wait
        #[serde(with = "humantime_serde")]
        max_interval: Duration,
    },
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self::Exponential {
            multiplier: 2.0,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

impl PollBackoff {
    /// Wait to use after the next pending observation, given the current one.
    #[must_use]
    pub fn grow(&self, current: Duration, min_interval: Duration) -> Duration {
        match *self {
            Self::Fixed => min_interval,
            Self::Exponential {
                multiplier,
                max_interval,
            } => {
                let ceiling = max_interval.max(min_interval);
                // Grow in f64 so a large multiplier saturates at the ceiling.
                Duration::try_from_secs_f64(current.as_secs_f64() * multiplier)
                    .map_or(ceiling, |grown| grown.min(ceiling))
                    .max(min_interval)
            }
        }
    }

    /// Check the policy against the poller's minimum interval.
    pub fn validate(&self, min_interval: Duration) -> ConfigResult<()> {
        match *self {
            Self::Fixed => Ok(()),
            Self::Exponential {
                multiplier,
                max_interval,
            } => {
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(ConfigError::validation(format!(
                        "backoff multiplier must be a finite value >= 1.0, got {multiplier}"
                    )));
                }
                if max_interval < min_interval {
                    return Err(ConfigError::validation(format!(
                        "backoff max_interval {max_interval:?} is below min_interval {min_interval:?}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Policy name for logs.
    pub fn policy_name(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Exponential { .. } => "exponential",
        }
    }
}

/// Jitter applied to each wait to avoid synchronized probing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterPolicy {
    /// No jitter - use the calculated wait exactly
    #[default]
    None,
    /// Full jitter: random(0, wait)
    Full,
    /// Equal jitter: wait/2 + random(0, wait/2)
    Equal,
    /// Decorrelated jitter: random(wait, previous * 3)
    Decorrelated,
}

impl JitterPolicy {
    /// Apply jitter to a wait using a fast RNG.
    #[must_use]
    pub fn apply(self, delay: Duration, previous_delay: Option<Duration>) -> Duration {
        match self {
            Self::None => delay,
            Self::Full => {
                let millis = delay.as_millis() as u64;
                if millis == 0 {
                    return delay;
                }
                Duration::from_millis(fastrand::u64(0..=millis))
            }
            Self::Equal => {
                let millis = delay.as_millis() as u64;
                let half = millis / 2;
                let jitter = if half > 0 { fastrand::u64(0..=half) } else { 0 };
                Duration::from_millis(half + jitter)
            }
            Self::Decorrelated => {
                let base = delay.as_millis() as u64;
                if let Some(prev) = previous_delay {
                    let upper = (prev.as_millis() as u64).saturating_mul(3).max(base);
                    Duration::from_millis(fastrand::u64(base..=upper))
                } else {
                    Self::Equal.apply(delay, None)
                }
            }
        }
    }
}
