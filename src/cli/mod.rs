//! Command-line interface implementation
//!
//! `assetflow` has a single mode of operation: clean the destination, build
//! every asset kind, then watch and serve until interrupted.

mod build;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::env::Environment;

pub use build::run_pipeline;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Assetflow - build a static site's assets, then watch and serve with live reload
#[derive(Parser, Debug)]
#[command(name = "assetflow")]
#[command(about = "Assetflow - build a static site's assets, then watch and serve with live reload")]
#[command(version)]
pub struct Cli {
    /// Config file (default: assetflow.toml found by walking up from the current directory)
    #[arg(short, long, env = "ASSETFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source directory (overrides project.src)
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// Output directory (overrides project.out)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Build environment: development or production
    #[arg(short, long, env = "ASSETFLOW_ENV", default_value = "development")]
    pub env: Environment,

    /// Dev server port (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Dev server host (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Log stage-level detail
    #[arg(short, long)]
    pub verbose: bool,
}

/// Console logging. `RUST_LOG` wins unless `--verbose` is given.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_filter(filter))
        .init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_pipeline(&cli)
}
