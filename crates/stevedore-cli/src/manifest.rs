//! Container manifests read by the CLI.
//!
//! A manifest lists containers in launch order, optionally with a family
//! name and configuration overrides. YAML and JSON are accepted; the format
//! is picked from the file extension.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use stevedore_common::config::StevedoreConfig;
use stevedore_common::types::ContainerSet;

/// Parsed manifest file.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Family name, used when `--name` is not given.
    #[serde(default)]
    pub name: Option<String>,
    /// Containers in defined order.
    pub containers: ContainerSet,
    /// Configuration overrides.
    #[serde(default)]
    pub config: StevedoreConfig,
}

/// Loads a manifest from a `.yaml`, `.yml` or `.json` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load(path: &Path) -> anyhow::Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read manifest {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let manifest = if is_json {
        serde_json::from_str(&content).with_context(|| format!("invalid JSON manifest {}", path.display()))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("invalid YAML manifest {}", path.display()))?
    };
    tracing::debug!(path = %path.display(), "loaded manifest");
    Ok(manifest)
}
