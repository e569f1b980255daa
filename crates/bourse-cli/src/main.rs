mod cli;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    let warehouse = commands::open_warehouse(&cli)?;

    if let Command::Serve(args) = &cli.command {
        return commands::serve::run(args, warehouse).await;
    }

    let envelope = commands::run(&cli, &warehouse)?;
    output::render(&envelope, cli.format, cli.pretty)
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
