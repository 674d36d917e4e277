//! Keyward Resilience - waiting out eventual consistency
//!
//! Remote systems that acknowledge a write before it is readable need the
//! caller to keep probing until the change is observable. This crate holds
//! the machinery for that:
//!
//! - [`ConsistencyPoller`] - probe loop with pending/target labels, a hard
//!   deadline and a required streak of consecutive target observations
//! - [`PollBackoff`] / [`JitterPolicy`] - spacing between probes
//! - [`PollError`] - timeout, unexpected state and probe failure, kept apart
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use keyward_resilience::{ConsistencyPoller, PollConfig, Probe};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let poller = ConsistencyPoller::new(
//!     PollConfig::new(["Waiting"], "Done").with_timeout(Duration::from_secs(30)),
//! )?;
//!
//! let polled = poller
//!     .poll(|| async { Ok::<_, std::io::Error>(Probe::new(42, "Done")) })
//!     .await?;
//! assert_eq!(polled.value, 42);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod backoff;
pub mod error;
pub mod poll;

pub use backoff::{JitterPolicy, PollBackoff};
pub use error::{ConfigError, ConfigResult, PollError};
pub use poll::{ConsistencyPoller, PollConfig, PollSettings, Polled, Probe};
