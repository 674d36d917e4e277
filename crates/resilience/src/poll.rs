//! Consistency poller
//!
//! Repeatedly invokes a probe until the remote side reports the target state
//! enough times in a row. A single positive observation is not trusted:
//! replicas of an eventually-consistent store can answer differently from
//! one read to the next, so success needs a streak of
//! [`PollSettings::consecutive_target_hits`] target labels with no pending
//! label in between.
//!
//! The loop, per probe:
//!
//! - probe error: stop with [`PollError::Probe`], never retried
//! - pending label: reset the streak, wait, probe again
//! - target label: extend the streak, succeed once it is long enough
//! - any other label: stop with [`PollError::UnexpectedState`]
//!
//! The deadline is checked after every observation and bounds each probe.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{debug, info, warn};

use crate::backoff::{JitterPolicy, PollBackoff};
use crate::error::{ConfigError, ConfigResult, PollError};

/// Default number of consecutive target observations required.
pub const DEFAULT_CONSECUTIVE_TARGET_HITS: usize = 5;

/// Default floor for the wait between probes.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default hard timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One observation returned by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe<T, L> {
    /// Whatever the probe read
    pub value: T,
    /// State label classifying the read
    pub label: L,
}

impl<T, L> Probe<T, L> {
    /// Pair a value with its state label.
    pub fn new(value: T, label: L) -> Self {
        Self { value, label }
    }
}

/// Successful outcome of a poll.
#[derive(Debug, Clone)]
pub struct Polled<T> {
    /// Value from the probe that completed the target streak
    pub value: T,
    /// Probes issued
    pub attempts: usize,
    /// Time spent polling
    pub elapsed: Duration,
}

/// Label-independent poll tuning, suitable for configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Floor for the wait between probes
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,

    /// Target observations needed in a row before success
    pub consecutive_target_hits: usize,

    /// Wait before the first probe
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Growth of the wait while pending
    pub backoff: PollBackoff,

    /// Randomisation of each wait
    pub jitter: JitterPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            consecutive_target_hits: DEFAULT_CONSECUTIVE_TARGET_HITS,
            initial_delay: Duration::ZERO,
            backoff: PollBackoff::default(),
            jitter: JitterPolicy::None,
        }
    }
}

impl PollSettings {
    /// Validate the settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.consecutive_target_hits == 0 {
            return Err(ConfigError::validation(
                "consecutive_target_hits must be at least 1",
            ));
        }
        self.backoff.validate(self.min_interval)
    }
}

/// Full configuration for one poll: labels, deadline and tuning.
#[derive(Debug, Clone)]
pub struct PollConfig<L> {
    /// Labels meaning "not there yet"
    pub pending: Vec<L>,
    /// Label meaning "done"
    pub target: L,
    /// Hard limit on the whole poll
    pub timeout: Duration,
    /// Tuning
    pub settings: PollSettings,
}

impl<L> PollConfig<L> {
    /// Create a configuration with default timeout and tuning.
    pub fn new(pending: impl IntoIterator<Item = L>, target: L) -> Self {
        Self {
            pending: pending.into_iter().collect(),
            target,
            timeout: DEFAULT_TIMEOUT,
            settings: PollSettings::default(),
        }
    }

    /// Set the hard timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the tuning.
    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the floor for the wait between probes.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.settings.min_interval = min_interval;
        self
    }

    /// Set the required streak length.
    pub fn with_consecutive_target_hits(mut self, hits: usize) -> Self {
        self.settings.consecutive_target_hits = hits;
        self
    }

    /// Set the backoff policy.
    pub fn with_backoff(mut self, backoff: PollBackoff) -> Self {
        self.settings.backoff = backoff;
        self
    }
}

impl<L: PartialEq + fmt::Debug> PollConfig<L> {
    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pending.contains(&self.target) {
            return Err(ConfigError::validation(format!(
                "target state {:?} is also listed as pending",
                self.target
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::validation("timeout must be greater than zero"));
        }
        self.settings.validate()
    }
}

/// Probe loop waiting for a remote change to become observable.
#[derive(Debug, Clone)]
pub struct ConsistencyPoller<L> {
    config: PollConfig<L>,
}

impl<L> ConsistencyPoller<L>
where
    L: PartialEq + Clone + fmt::Debug,
{
    /// Create a poller, validating the configuration.
    pub fn new(config: PollConfig<L>) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Same poller with a different hard timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            config: self.config.clone().with_timeout(timeout),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &PollConfig<L> {
        &self.config
    }

    /// Run `probe` until the target streak completes, the deadline passes,
    /// the probe fails, or an unexpected label shows up.
    pub async fn poll<T, E, F, Fut>(&self, mut probe: F) -> Result<Polled<T>, PollError<T, L, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Probe<T, L>, E>>,
        E: fmt::Display,
    {
        let config = &self.config;
        let settings = &config.settings;
        let required = settings.consecutive_target_hits;

        let started = Instant::now();
        let deadline = started + config.timeout;

        let mut attempts = 0;
        let mut hits = 0;
        let mut wait = settings.min_interval;
        let mut previous_wait = None;
        let mut last: Option<Probe<T, L>> = None;

        if !settings.initial_delay.is_zero() {
            sleep_until(deadline.min(started + settings.initial_delay)).await;
        }

        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            let observed = match timeout(remaining, probe()).await {
                Ok(Ok(observed)) => observed,
                Ok(Err(source)) => {
                    warn!(attempts, error = %source, "Probe failed, abandoning poll");
                    return Err(PollError::Probe { attempts, source });
                }
                Err(_) => {
                    warn!(
                        attempts,
                        timeout_ms = config.timeout.as_millis(),
                        "Probe still running at deadline"
                    );
                    return Err(self.timed_out(started, attempts, last));
                }
            };

            if observed.label == config.target {
                hits += 1;
                debug!(attempts, hits, required, state = ?observed.label, "Target state observed");

                if hits >= required {
                    let elapsed = started.elapsed();
                    info!(
                        attempts,
                        elapsed_ms = elapsed.as_millis(),
                        "Target state confirmed"
                    );
                    return Ok(Polled {
                        value: observed.value,
                        attempts,
                        elapsed,
                    });
                }
            } else if config.pending.contains(&observed.label) {
                if hits > 0 {
                    debug!(attempts, streak = hits, "Target streak broken by pending state");
                }
                hits = 0;
                debug!(attempts, state = ?observed.label, "Pending state observed");
            } else {
                let mut expected = config.pending.clone();
                expected.push(config.target.clone());
                warn!(attempts, state = ?observed.label, expected = ?expected, "Unexpected state");
                return Err(PollError::UnexpectedState {
                    attempts,
                    expected,
                    observed,
                });
            }

            last = Some(observed);

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(started, attempts, last));
            }

            let delay = settings
                .jitter
                .apply(wait, previous_wait)
                .max(settings.min_interval);
            previous_wait = Some(delay);
            if hits == 0 {
                wait = settings.backoff.grow(wait, settings.min_interval);
            }

            debug!(
                attempts,
                delay_ms = delay.as_millis(),
                policy = settings.backoff.policy_name(),
                "Waiting before next probe"
            );
            sleep(delay.min(deadline - now)).await;
        }
    }

    fn timed_out<T, E>(
        &self,
        started: Instant,
        attempts: usize,
        last: Option<Probe<T, L>>,
    ) -> PollError<T, L, E> {
        let elapsed = started.elapsed();
        warn!(
            attempts,
            elapsed_ms = elapsed.as_millis(),
            last_state = ?last.as_ref().map(|probe| &probe.label),
            "Timed out waiting for target state"
        );
        PollError::Timeout {
            timeout: self.config.timeout,
            elapsed,
            attempts,
            last,
        }
    }
}
