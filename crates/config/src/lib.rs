//! Keyward Config - typed provider configuration
//!
//! [`ProviderConfig`] is loaded from an optional TOML file with a
//! `KEYWARD_*` environment overlay and validated once. [`ProviderConfig::resolve`]
//! turns it into [`ResolvedCredentials`]: inline values and credential files
//! are reconciled, workload identity is honoured and the client certificate
//! is decoded.
//!
//! ```rust,no_run
//! use keyward_config::ProviderConfig;
//!
//! # async fn example() -> Result<(), keyward_config::ConfigError> {
//! let config = ProviderConfig::load(Some("keyward.toml".as_ref())).await?;
//! let credentials = config.resolve().await?;
//! println!("tenant: {:?}", credentials.tenant_id);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod core;
pub mod loaders;
mod provider;
mod resolve;

pub use crate::core::{ConfigError, ConfigResult, ConfigSource};
pub use loaders::{EnvLoader, FileLoader};
pub use provider::ProviderConfig;
pub use resolve::{AKS_TENANT_ID_VAR, ResolvedCredentials};
