// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! baton - FIFO turn-taking for workers sharing one store

mod commands;
mod config;
mod demo;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{jobs, run, verify};

#[derive(Parser)]
#[command(
    name = "baton",
    version,
    about = "Baton - one worker at a time, in submission order"
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch participants that take turns appending to a shared file
    Run(run::RunArgs),
    /// Check that an output file contains no interleaved writes
    Verify(verify::VerifyArgs),
    /// List job records persisted in a write-ahead log
    Jobs(jobs::JobsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Verify(args) => verify::verify(args),
        Commands::Jobs(args) => jobs::jobs(args).await,
    }
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // stdout carries command output; logs go to stderr
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
