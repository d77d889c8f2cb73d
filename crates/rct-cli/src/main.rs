//! RCT CLI: the `rct229` command.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Evaluate {
            user,
            baseline,
            proposed,
            config,
            output,
            log,
            json,
        } => commands::evaluate::run(commands::evaluate::Args {
            user,
            baseline,
            proposed,
            config,
            output,
            log,
            json,
        }),

        Commands::Test {
            suites,
            dir,
            check_schema,
        } => commands::test::run(suites, dir, check_schema),

        Commands::Validate { rmr } => commands::validate::run(rmr),

        Commands::Rules { section, json } => commands::rules::run(section, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
