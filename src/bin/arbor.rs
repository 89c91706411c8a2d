//! Arbor CLI Binary
//!
//! Command-line interface for attachment path resolution and zip packaging.

use anyhow::Context;
use arbor::logging::init_logging;
use arbor::tooling::cli::{Cli, CliContext};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let context = CliContext::new(cli.root.clone(), cli.config.clone())
        .context("Error initializing workspace")?;

    let mut logging = context.config().logging.clone();
    cli.apply_logging_overrides(&mut logging);
    init_logging(Some(&logging)).context("Error initializing logging")?;

    let output = context.execute(&cli.command)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
