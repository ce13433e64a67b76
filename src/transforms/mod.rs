//! Asset transforms.
//!
//! One transform per [`AssetKind`]. Each is assembled from a
//! [`BuildContext`] (the environment decides which stages it contains) and
//! then run as often as needed: once by the build phase and again by the
//! watcher whenever one of its sources changes.

pub mod common;
pub mod font;
pub mod html;
pub mod image;
pub mod script;
pub mod style;

pub use font::FontTransform;
pub use html::HtmlTransform;
pub use image::ImageTransform;
pub use script::ScriptTransform;
pub use style::StyleTransform;

use crate::build::discovery::DiscoveryError;
use crate::build::{AssetKind, BuildContext, StageError};
use crate::css::color::ColorError;
use crate::css::CssError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Error that fails one run of one transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Css(#[from] CssError),
    #[error("invalid colour: {0}")]
    Color(#[from] ColorError),
}

impl TransformError {
    /// Whether the build must stop instead of moving on to the observe phase.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransformError::Stage(e) if e.is_fatal())
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Files written under the destination root
    pub written: Vec<PathBuf>,
    /// Sources skipped because their output was fresh
    pub unchanged: usize,
    /// Per-file problems that did not fail the run
    pub warnings: Vec<String>,
}

impl TransformOutput {
    pub fn written(written: Vec<PathBuf>) -> Self {
        Self { written, ..Self::default() }
    }

    /// Fold another output into this one.
    pub fn merge(&mut self, other: TransformOutput) {
        self.written.extend(other.written);
        self.unchanged += other.unchanged;
        self.warnings.extend(other.warnings);
    }
}

/// A build step for one asset kind.
pub trait AssetTransform: Send + Sync {
    fn kind(&self) -> AssetKind;

    /// Read sources, run the chain and write outputs.
    fn run(&self) -> Result<TransformOutput, TransformError>;
}

/// The five transforms, in [`AssetKind::ALL`] order.
pub fn default_transforms(
    ctx: &BuildContext,
) -> Result<Vec<Arc<dyn AssetTransform>>, TransformError> {
    Ok(vec![
        Arc::new(HtmlTransform::new(ctx)),
        Arc::new(StyleTransform::new(ctx)?),
        Arc::new(ScriptTransform::new(ctx)),
        Arc::new(ImageTransform::new(ctx)?),
        Arc::new(FontTransform::new(ctx)),
    ])
}
