//! `stv placement` — Print the placement constraints for a host OS.

use clap::Args;
use stevedore_common::types::HostOs;
use stevedore_compose::placement::constraints_for_host;

/// Arguments for the `placement` command.
#[derive(Args, Debug)]
pub struct PlacementArgs {
    /// Host OS to place tasks on (linux or windows).
    #[arg(long)]
    pub os: Option<HostOs>,
}

/// Executes the `placement` command.
///
/// # Errors
///
/// Returns an error if the constraints cannot be serialized.
pub fn execute(args: &PlacementArgs) -> anyhow::Result<()> {
    let constraints = constraints_for_host(args.os);
    println!("{}", serde_json::to_string_pretty(&constraints)?);
    Ok(())
}
