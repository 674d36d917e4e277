//! Error types for consistency polling

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::poll::Probe;

/// Result type for poller configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid poller configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A setting failed validation
    #[error("invalid poll configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Why a poll did not reach its target state.
///
/// `T` is the probed value, `L` the state label and `E` the probe's own
/// error. The three failure kinds are never folded into each other: a probe
/// error is a transport problem, a timeout means the remote side never
/// settled, and an unexpected state means it settled somewhere it should not.
#[derive(Debug)]
pub enum PollError<T, L, E> {
    /// The probe itself failed; polling stopped at once
    Probe {
        /// Probes issued, including the failing one
        attempts: usize,
        /// The probe's error
        source: E,
    },

    /// The deadline passed before the target streak completed
    Timeout {
        /// Configured timeout
        timeout: Duration,
        /// Time spent polling
        elapsed: Duration,
        /// Probes issued
        attempts: usize,
        /// Last observation, if any probe completed
        last: Option<Probe<T, L>>,
    },

    /// The probe reported a label that is neither pending nor target
    UnexpectedState {
        /// Probes issued, including the offending one
        attempts: usize,
        /// Labels the poller was prepared to see
        expected: Vec<L>,
        /// The offending observation
        observed: Probe<T, L>,
    },
}

impl<T, L, E> PollError<T, L, E> {
    /// Whether the deadline expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether an unrecognised label stopped the poll.
    pub fn is_unexpected_state(&self) -> bool {
        matches!(self, Self::UnexpectedState { .. })
    }

    /// Number of probes issued before giving up.
    pub fn attempts(&self) -> usize {
        match self {
            Self::Probe { attempts, .. }
            | Self::Timeout { attempts, .. }
            | Self::UnexpectedState { attempts, .. } => *attempts,
        }
    }

    /// Last label observed, if any.
    pub fn last_label(&self) -> Option<&L> {
        match self {
            Self::Probe { .. } => None,
            Self::Timeout { last, .. } => last.as_ref().map(|probe| &probe.label),
            Self::UnexpectedState { observed, .. } => Some(&observed.label),
        }
    }
}

impl<T, L: fmt::Debug, E: fmt::Display> fmt::Display for PollError<T, L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe { attempts, source } => {
                write!(f, "probe failed on attempt {attempts}: {source}")
            }
            Self::Timeout {
                timeout,
                attempts,
                last,
                ..
            } => {
                write!(f, "timed out after {timeout:?} ({attempts} probes")?;
                match last {
                    Some(probe) => write!(f, ", last state {:?})", probe.label),
                    None => write!(f, ", no probe completed)"),
                }
            }
            Self::UnexpectedState {
                expected, observed, ..
            } => write!(
                f,
                "unexpected state {:?}, wanted one of {expected:?}",
                observed.label
            ),
        }
    }
}

impl<T, L, E> StdError for PollError<T, L, E>
where
    T: fmt::Debug,
    L: fmt::Debug,
    E: StdError + 'static,
{
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Probe { source, .. } => Some(source),
            _ => None,
        }
    }
}
