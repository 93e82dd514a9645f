//! CLI command definitions and dispatch.

pub mod placement;
pub mod render;
pub mod size;

use clap::{Parser, Subcommand};
use stevedore_common::constants::BIN_NAME;

/// Stevedore — compose and size container task definitions.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the default cpu/memory tier of a container manifest.
    Size(size::SizeArgs),
    /// Render the task definition a manifest would register.
    Render(render::RenderArgs),
    /// Print the placement constraints for a host OS.
    Placement(placement::PlacementArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Size(args) => size::execute(&args),
        Command::Render(args) => render::execute(&args),
        Command::Placement(args) => placement::execute(&args),
    }
}
