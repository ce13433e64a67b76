//! Build context shared by every transform.

use crate::config::{loader::resolve_path, AssetflowConfig, ConfigError, PathConfig};
use crate::env::Environment;
use std::path::{Path, PathBuf};

/// Build context containing configuration and resolved paths.
///
/// Created once at startup and shared (behind an `Arc`) by the task graph,
/// every transform and the watcher. Nothing in it changes after
/// construction.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Selected environment
    env: Environment,
    /// The loaded configuration
    config: AssetflowConfig,
    /// Resolved source/destination layout
    paths: PathConfig,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `config` - The loaded configuration, with CLI overrides already merged
    /// - `project_root` - The project root directory
    /// - `env` - The environment every transform is built for
    pub fn new(
        config: AssetflowConfig,
        project_root: &Path,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let paths = PathConfig::from_config(&config, project_root)?;
        Ok(Self { env, config, paths, verbose: false })
    }

    pub fn env(&self) -> Environment {
        self.env
    }

    /// Get the configuration.
    pub fn config(&self) -> &AssetflowConfig {
        &self.config
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.paths.project_root
    }

    pub fn src_root(&self) -> &Path {
        &self.paths.src_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.paths.dest_root
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Extra Sass load paths, resolved against the project root.
    pub fn style_load_paths(&self) -> Vec<PathBuf> {
        self.config
            .style
            .load_paths
            .iter()
            .map(|p| resolve_path(&self.paths.project_root, p))
            .collect()
    }
}
