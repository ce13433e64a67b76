//! Watch mode: re-run the transforms whose sources changed.
//!
//! A debounced `notify` watcher on the source root feeds batches of changed
//! paths to a [`Dispatcher`], which maps each batch to the asset kinds whose
//! watch glob matches and runs exactly those transforms.

use crate::build::{execute, AssetKind, BuildContext, SourceGlob, TransformResult};
use crate::transforms::AssetTransform;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// The watcher stopped delivering events
    #[error("Watch channel closed")]
    Disconnected,
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Maps changed paths to the transforms that consume them.
pub struct Dispatcher {
    bindings: Vec<(SourceGlob, AssetKind)>,
    transforms: Vec<Arc<dyn AssetTransform>>,
}

impl Dispatcher {
    pub fn new(
        bindings: Vec<(SourceGlob, AssetKind)>,
        transforms: Vec<Arc<dyn AssetTransform>>,
    ) -> Self {
        Self { bindings, transforms }
    }

    /// Bindings taken from the context's watch globs.
    pub fn from_context(ctx: &BuildContext, transforms: Vec<Arc<dyn AssetTransform>>) -> Self {
        let bindings =
            ctx.paths().watch.iter().map(|(kind, glob)| (glob.clone(), *kind)).collect();
        Self::new(bindings, transforms)
    }

    /// Kinds whose watch glob matches any of `paths`, deduplicated, in
    /// [`AssetKind::ALL`] order.
    pub fn kinds_for(&self, paths: &[PathBuf]) -> Vec<AssetKind> {
        AssetKind::ALL
            .iter()
            .copied()
            .filter(|kind| {
                self.bindings
                    .iter()
                    .filter(|(_, bound)| bound == kind)
                    .any(|(glob, _)| paths.iter().any(|p| glob.is_match(p)))
            })
            .collect()
    }

    /// Run the transforms bound to `paths`. Each runs once per batch.
    pub fn dispatch(&self, paths: &[PathBuf]) -> Vec<TransformResult> {
        let kinds = self.kinds_for(paths);
        if kinds.is_empty() {
            return vec![];
        }
        tracing::debug!("changes affect {:?}", kinds);
        self.transforms
            .par_iter()
            .filter(|t| kinds.contains(&t.kind()))
            .map(|t| execute(t.as_ref()))
            .collect()
    }
}

/// Handle debounced batches until the channel closes.
///
/// Transform failures, fatal ones included, are logged by [`execute`] and
/// watching continues.
pub fn run_dispatch_loop(
    dispatcher: &Dispatcher,
    rx: Receiver<DebounceEventResult>,
) -> Result<(), WatchError> {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path)
                    .collect();
                for path in &changed {
                    tracing::debug!("changed: {}", path.display());
                }
                dispatcher.dispatch(&changed);
            }
            Ok(Err(error)) => {
                tracing::warn!("watch error: {}", error);
            }
            Err(_) => return Err(WatchError::Disconnected),
        }
    }
}

/// Source watcher for the observe phase.
pub struct Watcher {
    src_root: PathBuf,
    debounce: Duration,
    dispatcher: Dispatcher,
}

impl Watcher {
    pub fn new(ctx: &BuildContext, transforms: Vec<Arc<dyn AssetTransform>>) -> Self {
        Self {
            src_root: ctx.src_root().to_path_buf(),
            debounce: Duration::from_millis(u64::from(ctx.config().watch.debounce_ms)),
            dispatcher: Dispatcher::from_context(ctx, transforms),
        }
    }

    /// Block watching the source root. Only returns on error.
    pub fn run(self) -> Result<(), WatchError> {
        if !self.src_root.is_dir() {
            return Err(WatchError::SourceNotFound(self.src_root));
        }

        let (tx, rx) = channel();
        let mut debouncer = new_debouncer(self.debounce, tx).map_err(WatchError::WatcherInit)?;
        debouncer
            .watcher()
            .watch(&self.src_root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: self.src_root.clone(), source })?;

        tracing::info!("watching {} for changes", self.src_root.display());
        run_dispatch_loop(&self.dispatcher, rx)
    }
}
