//! `stv size` — Compute the default task sizing of a manifest.

use std::path::PathBuf;

use clap::Args;
use stevedore_compose::sizing::compute_sizing;

use crate::output::{format_mib, format_vcpu};

/// Arguments for the `size` command.
#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Path to the container manifest (YAML or JSON).
    #[arg(default_value = "stevedore.yaml")]
    pub file: PathBuf,
}

/// Executes the `size` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded.
pub fn execute(args: &SizeArgs) -> anyhow::Result<()> {
    let manifest = crate::manifest::load(&args.file)?;
    let sizing = compute_sizing(&manifest.containers);

    println!("Task sizing for: {}", args.file.display());
    println!();
    for container in &manifest.containers {
        let cpu = container.cpu.map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "  {:<20} cpu {:>6}  memory {:>10}",
            container.name,
            cpu,
            format_mib(u64::from(container.memory_demand()))
        );
    }
    println!();
    println!("  cpu:    {} ({})", sizing.cpu(), format_vcpu(sizing.cpu_units));
    println!("  memory: {} ({})", sizing.memory(), format_mib(sizing.memory_mib));
    Ok(())
}
