//! Stylesheet helpers used by the style transform.
//!
//! - [`glob_import`]: expands glob `@import`s before Sass compilation
//! - [`media`]: merges duplicate top-level media queries
//! - [`pxtorem`]: converts px lengths to rem
//! - [`postprocess`]: vendor prefixing and minification
//! - [`color`]: colour values in configuration

pub mod color;
pub mod glob_import;
pub mod media;
pub mod postprocess;
pub mod pxtorem;

pub use glob_import::{expand_glob_imports, GlobImports};
pub use media::group_media;
pub use postprocess::PostProcessor;
pub use pxtorem::PxToRem;

use thiserror::Error;

/// Error raised while parsing or printing CSS.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssError {
    #[error("CSS parse error: {0}")]
    Parse(String),
    #[error("CSS minify error: {0}")]
    Minify(String),
    #[error("CSS print error: {0}")]
    Print(String),
    #[error("invalid browserslist query: {0}")]
    Browsers(String),
}
