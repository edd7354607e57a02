//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`runner::run`].

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use gosh_freeze::cli::{Cli, EX_USAGE};
use gosh_freeze::{interrupt, runner};
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == ErrorKind::DisplayVersion => {
            // Rendering the version can only fail on a closed stdout.
            return if err.print().is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        Err(err) => return usage_exit(&err.render().to_string()),
    };
    if cli.wants_usage() {
        return usage_exit(&Cli::usage());
    }

    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();
    if let Err(err) = interrupt::install() {
        tracing::warn!("termination signals will not clean up: {err}");
    }
    match runner::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("gosh-freeze failed: {err:#}");
            if let Some(help) = runner::diagnostic_help(&err) {
                tracing::error!("help: {help}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Print `text` to stderr and report a usage error.
fn usage_exit(text: &str) -> ExitCode {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{}", text.trim_end())
        .map_or(ExitCode::FAILURE, |()| ExitCode::from(EX_USAGE))
}
