//! Configuration module for assetflow
//!
//! Provides types and parsing for `assetflow.toml` project configuration and
//! the resolved [`PathConfig`] built from it.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::{default_config, load_config, CliOverrides, ConfigError};
pub use paths::{DestDirs, PathConfig, SourceGlobs};
pub use schema::*;
