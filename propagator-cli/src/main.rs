//! PRD propagator CLI.
//!
//! # Usage
//!
//! ```text
//! propagator update [--dry-run] [--site <owner/name>] [--prd <path>] [--registry <path>]
//!                   [--logs-dir <dir>] [--work-dir <dir>] [--json]
//! propagator site add <owner/name> [name] [--registry <path>]
//! propagator site list [--registry <path>]
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{site::SiteCommand, update::UpdateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "propagator",
    version,
    about = "Propagate a requirements document to a fleet of site repositories",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the update pipeline over every enabled site (or one with --site).
    Update(UpdateArgs),

    /// Manage the site registry.
    Site {
        #[command(subcommand)]
        command: SiteCommand,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome: Result<ExitCode> = match cli.command {
        Commands::Update(args) => args.run(),
        Commands::Site { command } => commands::site::run(command).map(|()| ExitCode::SUCCESS),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
