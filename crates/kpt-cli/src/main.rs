//! kpt-cli — a thin smoke-test binary wiring the kpt package-orchestration
//! library crates together. Flag parsing is explicitly out of scope for the
//! core (spec.md §6); this binary exists to exercise it, not to satisfy any
//! spec'd operation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "kpt")]
#[command(version)]
#[command(about = "Smoke-test harness for the kpt package-orchestration core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hydrate a package tree and print (or write back) the flattened
    /// resource stream.
    Render {
        /// Package root directory
        path: PathBuf,

        /// Grant the exec capability to `exec`-specified functions
        #[arg(long)]
        allow_exec: bool,

        /// Write the hydrated resources back under `path` instead of
        /// printing them
        #[arg(long)]
        write: bool,
    },

    /// Seed an in-memory orchestration cache from a package directory and
    /// print its revision listing.
    CacheList {
        /// Package root directory to load resources from
        path: PathBuf,

        /// Package path to register the seeded revision under
        #[arg(long, default_value = "demo-package")]
        package_path: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render { path, allow_exec, write } => commands::render::run(&path, allow_exec, write),
        Commands::CacheList { path, package_path } => commands::cache_list::run(&path, &package_path).await,
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
