//! Static validation of a container set before provisioning.

use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerSet, ContainerSpec};

/// Returns the single container that declares a load balancer port, if any.
///
/// # Errors
///
/// Returns a configuration error if more than one container declares a
/// load balancer port.
pub fn validate(containers: &ContainerSet) -> Result<Option<(&str, &ContainerSpec)>> {
    tracing::debug!(containers = containers.len(), "validating container set");
    let mut matched: Option<(&str, &ContainerSpec)> = None;
    for spec in containers {
        if spec.load_balancer_port.is_none() {
            continue;
        }
        if let Some((first, _)) = matched {
            return Err(StevedoreError::configuration(format!(
                "only a single container can specify a load balancer port (found \"{first}\" and \"{}\")",
                spec.name
            )));
        }
        matched = Some((spec.name.as_str(), spec));
    }
    Ok(matched)
}
