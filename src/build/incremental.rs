//! Incremental build support.
//!
//! Compares each source's modification time against the file it would be
//! written to. A source whose output exists and is at least as new is
//! *fresh* and is neither read nor rewritten.
//!
//! Only the image transform is incremental: its per-file work is expensive
//! and its outputs map one-to-one onto sources.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Freshness probe for one source/destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub source_mtime: Option<SystemTime>,
    /// `None` when the destination does not exist yet
    pub dest_mtime: Option<SystemTime>,
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl ChangeRecord {
    /// Read both modification times from disk.
    pub fn probe(source: &Path, dest: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            source_mtime: mtime(source),
            dest_mtime: mtime(dest),
        }
    }

    /// Stale when there is no output yet or the source is strictly newer.
    pub fn is_stale(&self) -> bool {
        match (self.source_mtime, self.dest_mtime) {
            (_, None) => true,
            (Some(src), Some(dest)) => src > dest,
            (None, Some(_)) => true,
        }
    }
}

/// Maps sources under `base` onto outputs under `dest_dir` and filters stale ones.
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    base: PathBuf,
    dest_dir: PathBuf,
}

/// Outcome of splitting a source list by freshness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Sources that must be processed
    pub stale: Vec<PathBuf>,
    /// Number of sources skipped as fresh
    pub fresh: usize,
}

impl ChangeTracker {
    pub fn new(base: &Path, dest_dir: &Path) -> Self {
        Self { base: base.to_path_buf(), dest_dir: dest_dir.to_path_buf() }
    }

    /// Output path for a source.
    pub fn dest_for(&self, source: &Path) -> PathBuf {
        let relative = source.strip_prefix(&self.base).unwrap_or(source);
        self.dest_dir.join(relative)
    }

    pub fn record(&self, source: &Path) -> ChangeRecord {
        ChangeRecord::probe(source, &self.dest_for(source))
    }

    /// Keep the stale sources, preserving order.
    pub fn split(&self, sources: Vec<PathBuf>) -> ChangeSet {
        let mut set = ChangeSet::default();
        for source in sources {
            if self.record(&source).is_stale() {
                set.stale.push(source);
            } else {
                tracing::debug!("{} is up to date", source.display());
                set.fresh += 1;
            }
        }
        set
    }
}
