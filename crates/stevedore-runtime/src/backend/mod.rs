//! Collaborator abstraction over the orchestration platform.
//!
//! Every supporting resource a task definition needs is created through one
//! of these traits. Construction-time calls are synchronous; the cluster's
//! network lookup and the launch call are asynchronous because they happen
//! on every `run`.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stevedore_common::error::Result;
use stevedore_common::types::{
    Compatibility, LaunchFailure, LaunchKind, LoadBalancerHandle, LoadBalancerPort, LogGroup,
    NetworkMode, Role, TrustPolicy,
};
use stevedore_compose::lowering::KeyValuePair;
use stevedore_compose::placement::PlacementConstraint;

/// Network values of a cluster at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNetwork {
    /// Subnets tasks are placed into.
    pub subnet_ids: Vec<String>,
    /// Security group applied to task interfaces.
    pub security_group_id: String,
    /// Whether the subnets are private (no public address assignment).
    pub uses_private_subnets: bool,
}

/// Cluster that tasks run in.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Cluster name.
    fn name(&self) -> &str;

    /// Cluster ARN passed to the launch API.
    fn arn(&self) -> &str;

    /// Creates a load balancer for one container port.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the cluster cannot front the port,
    /// or a provisioning error if creation fails.
    fn create_load_balancer(&self, name: &str, port: &LoadBalancerPort) -> Result<LoadBalancerHandle>;

    /// Looks up the cluster's current subnets and security group.
    ///
    /// # Errors
    ///
    /// Returns an error if the network values cannot be resolved.
    async fn current_network(&self) -> Result<ClusterNetwork>;
}

/// Identity backend creating roles and attaching policies.
pub trait IdentityBackend: Send + Sync {
    /// Creates a role assumable under `trust_policy`.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error if the role cannot be created.
    fn create_role(&self, name: &str, trust_policy: &TrustPolicy) -> Result<Role>;

    /// Attaches a managed policy to a role.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error if the attachment fails.
    fn attach_policy(&self, attachment_name: &str, role: &Role, policy_arn: &str) -> Result<()>;
}

/// Log backend creating log groups.
pub trait LogBackend: Send + Sync {
    /// Creates a log group with the given retention.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error if the group cannot be created.
    fn create_log_group(&self, name: &str, retention_days: u32) -> Result<LogGroup>;
}

/// Task definition document registered with the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTaskDefinition {
    /// Family name.
    pub family: String,
    /// JSON-encoded container definitions.
    pub container_definitions: String,
    /// Task role ARN.
    pub task_role_arn: String,
    /// Execution role ARN.
    pub execution_role_arn: String,
    /// Task CPU.
    pub cpu: String,
    /// Task memory.
    pub memory: String,
    /// Network mode.
    pub network_mode: NetworkMode,
    /// Required launch compatibilities.
    pub requires_compatibilities: Vec<Compatibility>,
}

/// Registry persisting task definitions on the platform.
pub trait TaskDefinitionRegistry: Send + Sync {
    /// Registers a task definition revision and returns its ARN.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error if registration fails.
    fn register(&self, definition: &RegisterTaskDefinition) -> Result<String>;
}

/// VPC networking of a launched task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsVpcConfiguration {
    /// Whether the task interface gets a public address.
    pub assign_public_ip: bool,
    /// Security groups of the task interface.
    pub security_groups: Vec<String>,
    /// Subnets the task is placed into.
    pub subnets: Vec<String>,
}

/// Per-container override sent with a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOverride {
    /// Container the override applies to.
    pub name: String,
    /// Resolved environment entries.
    pub environment: Vec<KeyValuePair>,
}

/// A single launch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskRequest {
    /// Cluster ARN.
    pub cluster: String,
    /// Task definition ARN.
    pub task_definition: String,
    /// Host placement constraints.
    pub placement_constraints: Vec<PlacementConstraint>,
    /// Launch kind.
    pub launch_type: LaunchKind,
    /// VPC networking, present for `awsvpc` tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<AwsVpcConfiguration>,
    /// Container overrides.
    pub container_overrides: Vec<ContainerOverride>,
}

/// Result of a launch call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTaskResponse {
    /// ARNs of started tasks.
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Per-task failures.
    #[serde(default)]
    pub failures: Vec<LaunchFailure>,
}

/// The platform's launch API.
#[async_trait]
pub trait TaskLaunchApi: Send + Sync {
    /// Starts tasks from a registered task definition.
    ///
    /// # Errors
    ///
    /// Returns a network error if the call cannot be completed. Per-task
    /// failures are reported in the response, not as an error.
    async fn run_task(&self, request: RunTaskRequest) -> Result<RunTaskResponse>;
}

/// The collaborators a task definition is built and launched against.
#[derive(Clone)]
pub struct Backends {
    /// Owning cluster.
    pub cluster: Arc<dyn Cluster>,
    /// Identity backend.
    pub identity: Arc<dyn IdentityBackend>,
    /// Log backend.
    pub logs: Arc<dyn LogBackend>,
    /// Task definition registry.
    pub registry: Arc<dyn TaskDefinitionRegistry>,
    /// Launch API.
    pub launcher: Arc<dyn TaskLaunchApi>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("cluster", &self.cluster.name())
            .finish_non_exhaustive()
    }
}
