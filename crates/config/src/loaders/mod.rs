//! Configuration loader implementations

mod env;
mod file;

pub use env::{DEFAULT_PREFIX, EnvLoader};
pub use file::FileLoader;
