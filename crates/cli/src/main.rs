// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wl - Windlass CLI

mod commands;
mod inputs;
mod journal;
mod output;

use clap::{Parser, Subcommand};
use commands::{list, run};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "wl",
    version,
    about = "Windlass - declarative workflow runner"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow by name or file path
    Run(run::RunArgs),
    /// List discovered workflows and fragments
    List(list::ListArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("{}", output::format_error(
                &format!("cannot change to directory {}: {e}", dir.display()),
                None,
            ));
            return output::usage_error();
        }
    }

    match cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::List(args) => list::execute(args),
    }
}
