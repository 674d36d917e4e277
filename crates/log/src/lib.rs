//! Keyward Log - environment-gated `tracing` setup
//!
//! Library crates only emit `tracing` events. Hosts call [`init`] once at
//! startup; output stays off unless `KEYWARD_LOG` (or `RUST_LOG`) carries a
//! filter directive, and acceptance runs (`KEYWARD_ACC` set) are always
//! silent.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), keyward_log::LogError> {
//! let _guard = keyward_log::init()?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```
//!
//! `KEYWARD_LOG_FORMAT` selects `compact` (default), `pretty` or `json`.
#![forbid(unsafe_code)]

mod builder;
pub mod config;
mod core;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Format, Writer};
pub use crate::core::{LogError, LogResult};

/// Initialize from the process environment
pub fn init() -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(Config::from_env()).build()
}

/// Initialize with an explicit configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialize for tests: environment-gated, written through libtest capture.
///
/// Safe to call from every test; an unparsable directive leaves logging off.
pub fn init_test() -> LoggerGuard {
    LoggerBuilder::from_config(Config::test())
        .build()
        .unwrap_or_else(|_| LoggerGuard::noop())
}
