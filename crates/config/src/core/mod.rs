//! Core configuration functionality

pub mod error;
pub mod source;

pub use error::{ConfigError, ConfigResult};
pub use source::ConfigSource;
