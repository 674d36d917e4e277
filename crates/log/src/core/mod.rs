//! Core logger types

mod error;

pub use error::{LogError, LogResult};
