//! Stage composition.
//!
//! A transform is an ordered [`Chain`] of [`Stage`]s. Each stage takes the
//! whole batch of file records and returns a new batch, so stages that merge
//! (concatenation) or filter (change tracking) fit the same shape as
//! per-file rewrites. Environment-gated stages are included or left out when
//! the chain is assembled; a built chain never branches at run time.

use crate::include::IncludeError;
use crate::sourcemap::SourceMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file flowing through a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Directory `path` is relative to
    pub base: PathBuf,
    /// Path relative to `base`; also the output path relative to the destination
    pub path: PathBuf,
    pub contents: Vec<u8>,
    /// Present once source map recording has started
    pub source_map: Option<SourceMap>,
}

impl FileRecord {
    pub fn new(base: &Path, path: &Path, contents: Vec<u8>) -> Self {
        Self { base: base.to_path_buf(), path: path.to_path_buf(), contents, source_map: None }
    }

    /// Absolute location of the source this record was read from.
    pub fn source_path(&self) -> PathBuf {
        self.base.join(&self.path)
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, StageError> {
        std::str::from_utf8(&self.contents)
            .map_err(|_| StageError::Encoding { path: self.source_path() })
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// Forward-slash path used in source maps and logs.
    pub fn display_name(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

/// Error raised by a stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Include(#[from] IncludeError),
    #[error("{}: {message}", .file.display())]
    Compile { file: PathBuf, message: String },
    #[error("{stage}: {message}")]
    Tool { stage: &'static str, message: String },
    #[error("{} is not valid UTF-8", .path.display())]
    Encoding { path: PathBuf },
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// Whether the error must abort the whole run instead of just this transform.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::Include(e) if e.is_fatal())
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StageError::Io { path: path.to_path_buf(), source }
    }
}

/// One processing step.
pub trait Stage: Send + Sync {
    /// Short name used in logs and chain inspection.
    fn name(&self) -> &'static str;

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError>;
}

/// Ordered list of stages.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Box<dyn Stage>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append a stage only when `enabled`.
    pub fn stage_if(self, enabled: bool, stage: impl Stage + 'static) -> Self {
        if enabled {
            self.stage(stage)
        } else {
            self
        }
    }

    /// Names of the stages in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, stopping at the first error.
    pub fn run(&self, mut files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        for stage in &self.stages {
            tracing::debug!(stage = stage.name(), files = files.len(), "running stage");
            files = stage.apply(files)?;
        }
        Ok(files)
    }
}

/// Write records under `dest`, creating directories as needed.
pub fn write_records(dest: &Path, records: &[FileRecord]) -> Result<Vec<PathBuf>, StageError> {
    let mut written = Vec::with_capacity(records.len());
    for record in records {
        let target = dest.join(&record.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
        }
        std::fs::write(&target, &record.contents).map_err(|e| StageError::io(&target, e))?;
        written.push(target);
    }
    Ok(written)
}
