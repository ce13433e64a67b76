//! Assetflow - static-site asset pipeline
//!
//! This library provides functionality to:
//! - Build HTML pages, Sass stylesheets, scripts, images and fonts into a
//!   publishable directory
//! - Pick development or production processing per run
//! - Rebuild only the affected asset kind when sources change
//! - Serve the output with live reload

pub mod build;
pub mod cli;
pub mod config;
pub mod css;
pub mod env;
pub mod include;
pub mod server;
pub mod sourcemap;
pub mod transforms;
pub mod watch;
