#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `oldto`: geocode the Old Toronto photo archive from the command line.
//!
//! Run with a subcommand for scripted use, or with none for an interactive
//! menu. Logging goes through [`oldto_cli_utils::init_logger`] so log lines
//! and progress bars share the terminal cleanly; set `RUST_LOG=debug` to see
//! which heuristic handled each title.

mod commands;
mod interactive;

use clap::{Parser, Subcommand};

use crate::commands::{DiffArgs, FetchArgs, GeocodeArgs, NounsArgs, PatchArgs};

#[derive(Parser)]
#[command(name = "oldto", about = "Old Toronto photo geocoding toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode photo titles into a `uniqueID -> location` JSON mapping
    Geocode(GeocodeArgs),
    /// Fetch a list of URLs through the disk cache
    Fetch(FetchArgs),
    /// Print a TSV histogram of capitalized noun phrases in titles
    Nouns(NounsArgs),
    /// Apply a corrections CSV to geocode results
    Patch(PatchArgs),
    /// Summarize the differences between two sets of geocodes
    Diff(DiffArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = oldto_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Old Toronto Toolchain");
        println!();
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Geocode(args) => commands::geocode(&args, &multi).await?,
        Commands::Fetch(args) => commands::fetch(&args, &multi).await?,
        Commands::Nouns(args) => commands::nouns(&args)?,
        Commands::Patch(args) => commands::patch(&args)?,
        Commands::Diff(args) => commands::diff(&args)?,
    }

    Ok(())
}
