//! Build orchestration for assetflow
//!
//! Turns the source tree into the published site in three phases:
//! - **Clean**: remove the destination root
//! - **Build**: run the five asset transforms concurrently
//! - **Observe**: rebuild on source changes and serve the output with live reload
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{BuildContext, TaskGraph};
//! use assetflow::config::load_config;
//! use assetflow::env::Environment;
//! use std::sync::Arc;
//!
//! let config = load_config(None)?;
//! let ctx = BuildContext::new(config, project_root, Environment::Development)?;
//! let graph = TaskGraph::new(Arc::new(ctx))?;
//!
//! graph.clean()?;
//! let report = graph.build().await;
//! println!("{}", report.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod graph;
pub mod incremental;
pub mod result;
pub mod stage;
pub mod target;

pub use context::*;
pub use discovery::*;
pub use graph::*;
pub use incremental::*;
pub use result::*;
pub use stage::*;
pub use target::*;
