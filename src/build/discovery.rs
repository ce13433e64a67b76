//! Source file discovery.
//!
//! Globs are resolved against a root directory. Each glob has a *base*: the
//! leading run of path components without glob characters. Outputs keep
//! their path relative to that base, so `pages/*.html` writes `index.html`
//! rather than `pages/index.html`.

use crate::build::FileRecord;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Error during source discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    InvalidPattern(String, globset::Error),
    /// IO error reading a discovered file
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
            DiscoveryError::Io(path, err) => {
                write!(f, "IO error reading {}: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Check whether a pattern contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// The non-glob leading directory of a pattern, relative to the pattern root.
///
/// For a pattern without glob characters the base is the parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    if !is_glob(pattern) {
        return path.parent().map(Path::to_path_buf).unwrap_or_default();
    }
    let mut base = PathBuf::new();
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if is_glob(&text) {
            break;
        }
        base.push(component);
    }
    base
}

/// A glob pattern anchored at a root directory.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    pattern: String,
    root: PathBuf,
    base: PathBuf,
    matcher: GlobMatcher,
}

impl SourceGlob {
    /// Compile `pattern`, interpreted relative to `root`.
    pub fn new(root: &Path, pattern: &str) -> Result<Self, DiscoveryError> {
        let normalized = pattern.trim_start_matches("./");
        let matcher = GlobBuilder::new(normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?
            .compile_matcher();
        Ok(Self {
            pattern: normalized.to_string(),
            root: root.to_path_buf(),
            base: root.join(glob_base(normalized)),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Absolute glob base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Check an absolute (or root-relative) path against the pattern.
    pub fn is_match(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.matcher.is_match(relative)
    }

    /// List matching files, sorted. A missing base directory yields nothing.
    pub fn discover(&self) -> Vec<PathBuf> {
        if !is_glob(&self.pattern) {
            let path = self.root.join(&self.pattern);
            return if path.is_file() { vec![path] } else { vec![] };
        }
        if !self.base.is_dir() {
            return vec![];
        }

        let mut walker = WalkDir::new(&self.base).follow_links(true);
        if !self.pattern.contains("**") {
            let depth = Path::new(&self.pattern).components().count()
                - glob_base(&self.pattern).components().count();
            walker = walker.max_depth(depth);
        }

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.is_match(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!("error reading path while matching '{}': {}", self.pattern, e);
                }
            }
        }

        files.sort();
        files
    }

    /// Path of a matched file relative to the glob base.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.base).unwrap_or(path)
    }
}

/// List files matching `include` that match none of `excludes`.
pub fn discover_excluding(include: &SourceGlob, excludes: &[&SourceGlob]) -> Vec<PathBuf> {
    include
        .discover()
        .into_iter()
        .filter(|path| !excludes.iter().any(|glob| glob.is_match(path)))
        .collect()
}

/// Read every match of `glob` into a file record keyed by its base-relative path.
pub fn read_records(glob: &SourceGlob) -> Result<Vec<FileRecord>, DiscoveryError> {
    glob.discover().into_iter().map(|path| read_record(glob.base(), &path)).collect()
}

/// Read one file into a record relative to `base`.
pub fn read_record(base: &Path, path: &Path) -> Result<FileRecord, DiscoveryError> {
    let contents = std::fs::read(path).map_err(|e| DiscoveryError::Io(path.to_path_buf(), e))?;
    let relative = path.strip_prefix(base).unwrap_or(path);
    Ok(FileRecord::new(base, relative, contents))
}

/// Lexically normalize a path, resolving `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
