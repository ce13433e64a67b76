//! The clean → build → observe run

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use super::{Cli, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, TaskGraph};
use crate::config::loader::{find_config, load_config, merge_cli_overrides};
use crate::config::{AssetflowConfig, CliOverrides, ConfigError};

/// Load the config and return it with the project root it is relative to.
fn load(explicit: Option<&Path>, cwd: &Path) -> Result<(AssetflowConfig, PathBuf), ConfigError> {
    let config_path = explicit.map(Path::to_path_buf).or_else(find_config);
    match config_path {
        Some(path) => {
            tracing::info!("using config {}", path.display());
            let config = load_config(Some(&path))?;
            let root = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
                _ => cwd.to_path_buf(),
            };
            Ok((config, root))
        }
        None => {
            tracing::debug!("no assetflow.toml found, using defaults");
            Ok((crate::config::default_config(), cwd.to_path_buf()))
        }
    }
}

/// Resolve the configuration from `cli` into a build context.
pub fn context_from_cli(cli: &Cli, cwd: &Path) -> Result<BuildContext, ConfigError> {
    let (mut config, project_root) = load(cli.config.as_deref(), cwd)?;

    let overrides = CliOverrides {
        out: cli.out.clone(),
        src: cli.src.clone(),
        port: cli.port,
        host: cli.host.clone(),
    };
    merge_cli_overrides(&mut config, &overrides);

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(BuildContext::new(config, &project_root, cli.env)?.with_verbose(cli.verbose))
}

/// Run the pipeline. Only returns on failure, or if observing stops.
pub fn run_pipeline(cli: &Cli) -> ExitCode {
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            tracing::error!("cannot read the current directory: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let ctx = match context_from_cli(cli, &cwd) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if !ctx.src_root().is_dir() {
        tracing::error!("source directory not found: {}", ctx.src_root().display());
        return ExitCode::from(EXIT_ERROR);
    }

    tracing::info!(
        "{} build: {} -> {}",
        ctx.env(),
        ctx.src_root().display(),
        ctx.dest_root().display()
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to start runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let result = runtime.block_on(async {
        let graph = TaskGraph::new(Arc::new(ctx))?;
        graph.run().await
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_context_from_explicit_config() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("site/assetflow.toml");
        fs::create_dir_all(config.parent().unwrap()).unwrap();
        fs::write(&config, "[project]\nout = \"public\"\n\n[server]\nport = 4000\n").unwrap();

        let cli = Cli::try_parse_from([
            "assetflow",
            "--config",
            config.to_str().unwrap(),
            "--port",
            "5000",
            "--env",
            "prod",
        ])
        .unwrap();
        let ctx = context_from_cli(&cli, temp.path()).unwrap();

        assert_eq!(ctx.env(), Environment::Production);
        assert_eq!(ctx.dest_root(), temp.path().join("site/public"));
        assert_eq!(ctx.src_root(), temp.path().join("site/src"));
        assert_eq!(ctx.config().server.port, 5000);
    }

    #[test]
    fn test_unsafe_destination_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("assetflow.toml");
        fs::write(&config, "").unwrap();

        let cli = Cli::try_parse_from(["assetflow", "--config", config.to_str().unwrap(), "--out", "."])
            .unwrap();
        assert!(matches!(
            context_from_cli(&cli, temp.path()),
            Err(ConfigError::UnsafeDestination(_))
        ));
    }
}
