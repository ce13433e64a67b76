//! Assetflow - build, watch and serve a static site's assets

use std::process::ExitCode;

use assetflow::cli;

fn main() -> ExitCode {
    cli::run()
}
