//! Glob expansion for Sass `@import`.
//!
//! `@import "blocks/**/*.scss";` becomes one `@import "<file>";` line per
//! match, sorted, with paths relative to the importing file's directory.
//! Imports without glob characters are left for the compiler.

use crate::build::discovery::{is_glob, DiscoveryError, SourceGlob};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:"([^"]+)"|'([^']+)')\s*;"#).expect("Invalid regex")
});

/// Result of expanding one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobImports {
    pub source: String,
    /// Every file pulled in by a glob, in import order
    pub files: Vec<PathBuf>,
}

/// Expand glob imports in `source`, resolving patterns against `dir`.
pub fn expand_glob_imports(source: &str, dir: &Path) -> Result<GlobImports, DiscoveryError> {
    let mut files = Vec::new();
    let mut error = None;

    let expanded = IMPORT_REGEX.replace_all(source, |caps: &Captures| {
        let pattern = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        if !is_glob(pattern) || error.is_some() {
            return caps[0].to_string();
        }
        let glob = match SourceGlob::new(dir, pattern) {
            Ok(glob) => glob,
            Err(e) => {
                error = Some(e);
                return caps[0].to_string();
            }
        };
        let matches = glob.discover();
        if matches.is_empty() {
            tracing::debug!("glob import '{}' matched no files", pattern);
        }
        let lines: Vec<String> = matches
            .iter()
            .map(|path| {
                let relative = path.strip_prefix(dir).unwrap_or(path);
                format!("@import \"{}\";", relative.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.extend(matches);
        lines.join("\n")
    });

    match error {
        Some(e) => Err(e),
        None => Ok(GlobImports { source: expanded.into_owned(), files }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_expands_sorted() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "blocks/_header.scss");
        touch(temp.path(), "blocks/_footer.scss");
        touch(temp.path(), "blocks/nested/_card.scss");

        let out =
            expand_glob_imports("@import \"vars\";\n@import \"blocks/**/*.scss\";\n", temp.path())
                .unwrap();
        assert_eq!(
            out.source,
            "@import \"vars\";\n@import \"blocks/_footer.scss\";\n@import \"blocks/_header.scss\";\n@import \"blocks/nested/_card.scss\";\n"
        );
        assert_eq!(out.files.len(), 3);
    }

    #[test]
    fn test_single_quotes_and_no_matches() {
        let temp = TempDir::new().unwrap();
        let out = expand_glob_imports("@import 'missing/*.scss';a{}", temp.path()).unwrap();
        assert_eq!(out.source, "a{}");
        assert!(out.files.is_empty());
    }

    #[test]
    fn test_plain_imports_untouched() {
        let temp = TempDir::new().unwrap();
        let src = "@import \"base\";\n@import 'mixins';";
        let out = expand_glob_imports(src, temp.path()).unwrap();
        assert_eq!(out.source, src);
    }

    #[test]
    fn test_invalid_glob_is_error() {
        let temp = TempDir::new().unwrap();
        let result = expand_glob_imports("@import \"blocks/[*.scss\";", temp.path());
        assert!(result.is_err());
    }
}
