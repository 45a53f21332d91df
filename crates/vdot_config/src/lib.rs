//! Parsing and validation of `vdot.toml` harness configuration files.
//!
//! This crate reads the optional configuration file and produces a
//! strongly-typed [`HarnessConfig`]. Missing sections fall back to the
//! reference run.

#![warn(missing_docs)]

pub mod duration;
pub mod error;
pub mod loader;
pub mod types;

pub use duration::{parse_duration, Duration};
pub use error::ConfigError;
pub use loader::{
    find_config, load_config, load_config_from_str, validate_config, CONFIG_FILE_NAME,
};
pub use types::*;
