//! Lowers container specs into the platform's container-definition shape.
//!
//! The lowered definitions are what gets serialized into the registered
//! task definition: environment maps become `{name, value}` lists, every
//! container logs to the task's log group, and the load-balanced container
//! gains a port mapping for its target port.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stevedore_common::constants::LOG_DRIVER;
use stevedore_common::error::Result;
use stevedore_common::types::{ContainerSet, ContainerSpec, NetworkMode};

/// A `{name, value}` pair as the platform encodes environment entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Port mapping of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u16,
    /// Port on the host; omitted for dynamic host ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    /// `tcp` or `udp`.
    pub protocol: String,
}

/// Log driver configuration of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    /// Log driver name.
    pub log_driver: String,
    /// Driver options.
    pub options: BTreeMap<String, String>,
}

/// Serialized container definition registered with the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Command override.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub command: Vec<String>,
    /// Essential flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
    /// CPU units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Hard memory limit in MiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Soft memory reservation in MiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<u32>,
    /// Environment entries.
    pub environment: Vec<KeyValuePair>,
    /// Port mappings.
    pub port_mappings: Vec<PortMapping>,
    /// Log configuration.
    pub log_configuration: LogConfiguration,
}

/// Where lowered containers send their logs, and how they are networked.
#[derive(Debug, Clone, Copy)]
pub struct LoweringContext<'a> {
    /// Log group name.
    pub log_group: &'a str,
    /// Region of the log group.
    pub region: &'a str,
    /// Log stream prefix.
    pub stream_prefix: &'a str,
    /// Network mode of the task.
    pub network_mode: NetworkMode,
}

/// Encodes an environment map as platform `{name, value}` entries.
#[must_use]
pub fn encode_environment(env: &BTreeMap<String, String>) -> Vec<KeyValuePair> {
    env.iter()
        .map(|(name, value)| KeyValuePair {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Lowers a single container spec.
#[must_use]
pub fn lower_container(spec: &ContainerSpec, ctx: &LoweringContext<'_>) -> ContainerDefinition {
    tracing::debug!(container = %spec.name, log_group = ctx.log_group, "lowering container");
    ContainerDefinition {
        name: spec.name.clone(),
        image: spec.image.clone(),
        command: spec.command.clone(),
        essential: spec.essential,
        cpu: spec.cpu,
        memory: spec.memory,
        memory_reservation: spec.memory_reservation,
        environment: encode_environment(&spec.environment),
        port_mappings: port_mappings(spec, ctx.network_mode),
        log_configuration: log_configuration(ctx),
    }
}

/// Lowers every container of a set, preserving order.
#[must_use]
pub fn lower_containers(containers: &ContainerSet, ctx: &LoweringContext<'_>) -> Vec<ContainerDefinition> {
    containers.iter().map(|spec| lower_container(spec, ctx)).collect()
}

/// Serializes lowered definitions into the JSON document the platform expects.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_definitions(definitions: &[ContainerDefinition]) -> Result<String> {
    Ok(serde_json::to_string(definitions)?)
}

fn port_mappings(spec: &ContainerSpec, network_mode: NetworkMode) -> Vec<PortMapping> {
    let Some(port) = spec.load_balancer_port else {
        return Vec::new();
    };
    let host_port = match network_mode {
        NetworkMode::None => return Vec::new(),
        NetworkMode::Awsvpc | NetworkMode::Host => Some(port.target_port),
        NetworkMode::Bridge => None,
    };
    vec![PortMapping {
        container_port: port.target_port,
        host_port,
        protocol: port.protocol.container_protocol().to_string(),
    }]
}

fn log_configuration(ctx: &LoweringContext<'_>) -> LogConfiguration {
    let mut options = BTreeMap::new();
    let _ = options.insert("awslogs-group".to_string(), ctx.log_group.to_string());
    let _ = options.insert("awslogs-region".to_string(), ctx.region.to_string());
    let _ = options.insert(
        "awslogs-stream-prefix".to_string(),
        ctx.stream_prefix.to_string(),
    );
    LogConfiguration {
        log_driver: LOG_DRIVER.to_string(),
        options,
    }
}
