//! Resolved path table.
//!
//! [`PathConfig`] is built once from the loaded configuration and the project
//! root. Globs are compiled here so that a bad pattern fails at startup
//! rather than inside a transform.

use super::loader::{resolve_path, ConfigError};
use super::schema::AssetflowConfig;
use crate::build::discovery::{normalize_path, DiscoveryError, SourceGlob};
use crate::build::AssetKind;
use std::path::{Path, PathBuf};

/// Compiled source globs used by the one-shot transforms.
#[derive(Debug, Clone)]
pub struct SourceGlobs {
    pub html: SourceGlob,
    pub style: SourceGlob,
    pub script: SourceGlob,
    pub sprite: SourceGlob,
    pub favicons: SourceGlob,
    pub images: SourceGlob,
    pub fonts: SourceGlob,
}

/// Absolute destination directories.
#[derive(Debug, Clone)]
pub struct DestDirs {
    pub html: PathBuf,
    pub style: PathBuf,
    pub script: PathBuf,
    pub images: PathBuf,
    pub favicons: PathBuf,
    pub fonts: PathBuf,
}

/// Source/destination layout of a project.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub project_root: PathBuf,
    pub src_root: PathBuf,
    pub dest_root: PathBuf,
    pub sources: SourceGlobs,
    /// Watch globs, one per asset kind
    pub watch: Vec<(AssetKind, SourceGlob)>,
    pub dest: DestDirs,
    pub style_libs: Vec<PathBuf>,
    pub script_libs: Vec<PathBuf>,
}

fn compile(role: &'static str, root: &Path, pattern: &str) -> Result<SourceGlob, ConfigError> {
    SourceGlob::new(root, pattern).map_err(|e| match e {
        DiscoveryError::InvalidPattern(pattern, source) => {
            ConfigError::Glob { role, pattern, source }
        }
        DiscoveryError::Io(_, io) => ConfigError::Io(io),
    })
}

impl PathConfig {
    /// Resolve every path in `config` against `project_root`.
    pub fn from_config(config: &AssetflowConfig, project_root: &Path) -> Result<Self, ConfigError> {
        let project_root = normalize_path(project_root);
        let src_root = normalize_path(&resolve_path(&project_root, &config.project.src));
        let dest_root = normalize_path(&resolve_path(&project_root, &config.project.out));

        if src_root.starts_with(&dest_root) || project_root.starts_with(&dest_root) {
            return Err(ConfigError::UnsafeDestination(dest_root));
        }

        let source = &config.paths.source;
        let sources = SourceGlobs {
            html: compile("paths.source.html", &src_root, &source.html)?,
            style: compile("paths.source.style", &src_root, &source.style)?,
            script: compile("paths.source.script", &src_root, &source.script)?,
            sprite: compile("paths.source.sprite", &src_root, &source.sprite)?,
            favicons: compile("paths.source.favicons", &src_root, &source.favicons)?,
            images: compile("paths.source.images", &src_root, &source.images)?,
            fonts: compile("paths.source.fonts", &src_root, &source.fonts)?,
        };

        let watch_cfg = &config.paths.watch;
        let watch = vec![
            (AssetKind::Html, compile("paths.watch.html", &src_root, &watch_cfg.html)?),
            (AssetKind::Style, compile("paths.watch.style", &src_root, &watch_cfg.style)?),
            (AssetKind::Script, compile("paths.watch.script", &src_root, &watch_cfg.script)?),
            (AssetKind::Image, compile("paths.watch.images", &src_root, &watch_cfg.images)?),
            (AssetKind::Font, compile("paths.watch.fonts", &src_root, &watch_cfg.fonts)?),
        ];

        let d = &config.paths.dest;
        let dest = DestDirs {
            html: dest_root.join(&d.html),
            style: dest_root.join(&d.style),
            script: dest_root.join(&d.script),
            images: dest_root.join(&d.images),
            favicons: dest_root.join(&d.favicons),
            fonts: dest_root.join(&d.fonts),
        };

        let libs = |paths: &[PathBuf]| -> Vec<PathBuf> {
            paths.iter().map(|p| resolve_path(&project_root, p)).collect()
        };

        Ok(Self {
            style_libs: libs(&config.paths.style_libs),
            script_libs: libs(&config.paths.script_libs),
            project_root,
            src_root,
            dest_root,
            sources,
            watch,
            dest,
        })
    }

    /// Watch glob bound to `kind`.
    pub fn watch_glob(&self, kind: AssetKind) -> Option<&SourceGlob> {
        self.watch.iter().find(|(k, _)| *k == kind).map(|(_, glob)| glob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = AssetflowConfig::default();
        let paths = PathConfig::from_config(&config, Path::new("/site")).unwrap();

        assert_eq!(paths.src_root, PathBuf::from("/site/src"));
        assert_eq!(paths.dest_root, PathBuf::from("/site/docs"));
        assert_eq!(paths.dest.html, PathBuf::from("/site/docs"));
        assert_eq!(paths.dest.style, PathBuf::from("/site/docs/assets"));
        assert_eq!(paths.dest.favicons, PathBuf::from("/site/docs/assets/images/favicons"));
        assert_eq!(paths.sources.html.base(), Path::new("/site/src/pages"));
        assert_eq!(paths.watch.len(), 5);
    }

    #[test]
    fn test_watch_globs_are_broader() {
        let config = AssetflowConfig::default();
        let paths = PathConfig::from_config(&config, Path::new("/site")).unwrap();

        let partial = Path::new("/site/src/assets/styles/blocks/_header.scss");
        assert!(!paths.sources.style.is_match(partial));
        assert!(paths.watch_glob(AssetKind::Style).unwrap().is_match(partial));

        let ttf = Path::new("/site/src/assets/fonts/inter.ttf");
        assert!(!paths.sources.fonts.is_match(ttf));
        assert!(paths.watch_glob(AssetKind::Font).unwrap().is_match(ttf));
    }

    #[test]
    fn test_rejects_destination_containing_sources() {
        let mut config = AssetflowConfig::default();
        config.project.out = PathBuf::from(".");
        let result = PathConfig::from_config(&config, Path::new("/site"));
        assert!(matches!(result, Err(ConfigError::UnsafeDestination(_))));

        let mut config = AssetflowConfig::default();
        config.project.out = PathBuf::from("src/..");
        let result = PathConfig::from_config(&config, Path::new("/site"));
        assert!(matches!(result, Err(ConfigError::UnsafeDestination(_))));
    }

    #[test]
    fn test_rejects_invalid_glob() {
        let mut config = AssetflowConfig::default();
        config.paths.source.images = "images/[*.png".to_string();
        let result = PathConfig::from_config(&config, Path::new("/site"));
        assert!(matches!(result, Err(ConfigError::Glob { role: "paths.source.images", .. })));
    }

    #[test]
    fn test_libs_resolve_against_project_root() {
        let mut config = AssetflowConfig::default();
        config.paths.style_libs = vec![PathBuf::from("node_modules/normalize.css/normalize.css")];
        let paths = PathConfig::from_config(&config, Path::new("/site")).unwrap();
        assert_eq!(
            paths.style_libs,
            vec![PathBuf::from("/site/node_modules/normalize.css/normalize.css")]
        );
    }
}
