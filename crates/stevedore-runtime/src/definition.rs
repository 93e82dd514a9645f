//! The immutable, registered task definition.

use std::fmt;
use std::sync::Arc;

use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{
    Compatibility, ContainerSet, HostOs, LaunchKind, LoadBalancerHandle, LogGroup, NetworkMode,
    Role, RunOptions,
};
use stevedore_compose::lowering::ContainerDefinition;
use stevedore_compose::validator::validate;

use crate::backend::{ClusterNetwork, TaskLaunchApi};
use crate::deferred::Deferred;
use crate::roles::ProvisionedRoles;

/// Everything a [`TaskDefinition`] is assembled from.
pub struct TaskDefinitionParts {
    /// Family name.
    pub family: String,
    /// ARN returned by the registry.
    pub arn: String,
    /// Caller-supplied containers in defined order.
    pub containers: ContainerSet,
    /// Lowered container definitions, as registered.
    pub container_definitions: Vec<ContainerDefinition>,
    /// Task CPU.
    pub cpu: String,
    /// Task memory.
    pub memory: String,
    /// Task and execution roles.
    pub roles: ProvisionedRoles,
    /// Network mode.
    pub network_mode: NetworkMode,
    /// Required launch compatibilities.
    pub requires_compatibilities: Vec<Compatibility>,
    /// Launch kind passed to every run.
    pub launch_kind: LaunchKind,
    /// Load balancer fronting the load-balanced container, if any.
    pub load_balancer: Option<LoadBalancerHandle>,
    /// Log group the containers write to.
    pub log_group: LogGroup,
    /// Owning cluster ARN.
    pub cluster_arn: String,
    /// Cluster network values, looked up per run.
    pub network: Deferred<ClusterNetwork>,
    /// Launch API used by `run`.
    pub launch_api: Arc<dyn TaskLaunchApi>,
    /// Host OS used when a run does not name one.
    pub default_os: HostOs,
}

/// A registered task definition that one-shot tasks can be launched from.
///
/// Built once by the SDK builders and immutable afterwards. Concurrent
/// [`TaskDefinition::run`] calls share nothing mutable.
pub struct TaskDefinition {
    parts: TaskDefinitionParts,
}

impl TaskDefinition {
    /// Assembles a task definition from already-provisioned parts.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the container set is empty or more
    /// than one container declares a load balancer port.
    pub fn new(parts: TaskDefinitionParts) -> Result<Self> {
        if parts.containers.is_empty() {
            return Err(StevedoreError::configuration(format!(
                "task definition \"{}\" has no containers",
                parts.family
            )));
        }
        let _ = validate(&parts.containers)?;
        Ok(Self { parts })
    }

    /// Family name.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.parts.family
    }

    /// Registered task definition ARN.
    #[must_use]
    pub fn arn(&self) -> &str {
        &self.parts.arn
    }

    /// Containers in defined order.
    #[must_use]
    pub const fn containers(&self) -> &ContainerSet {
        &self.parts.containers
    }

    /// Lowered container definitions.
    #[must_use]
    pub fn container_definitions(&self) -> &[ContainerDefinition] {
        &self.parts.container_definitions
    }

    /// Task CPU.
    #[must_use]
    pub fn cpu(&self) -> &str {
        &self.parts.cpu
    }

    /// Task memory.
    #[must_use]
    pub fn memory(&self) -> &str {
        &self.parts.memory
    }

    /// Role assumed by the running containers.
    #[must_use]
    pub const fn task_role(&self) -> &Role {
        &self.parts.roles.task
    }

    /// Role assumed by the platform agent.
    #[must_use]
    pub const fn execution_role(&self) -> &Role {
        &self.parts.roles.execution
    }

    /// Network mode.
    #[must_use]
    pub const fn network_mode(&self) -> NetworkMode {
        self.parts.network_mode
    }

    /// Required launch compatibilities.
    #[must_use]
    pub fn requires_compatibilities(&self) -> &[Compatibility] {
        &self.parts.requires_compatibilities
    }

    /// Launch kind.
    #[must_use]
    pub const fn launch_kind(&self) -> LaunchKind {
        self.parts.launch_kind
    }

    /// Load balancer fronting the load-balanced container.
    #[must_use]
    pub const fn load_balancer(&self) -> Option<&LoadBalancerHandle> {
        self.parts.load_balancer.as_ref()
    }

    /// Log group the containers write to.
    #[must_use]
    pub const fn log_group(&self) -> &LogGroup {
        &self.parts.log_group
    }

    /// Owning cluster ARN.
    #[must_use]
    pub fn cluster_arn(&self) -> &str {
        &self.parts.cluster_arn
    }

    /// Host OS used when a run does not name one.
    #[must_use]
    pub const fn default_os(&self) -> HostOs {
        self.parts.default_os
    }

    pub(crate) const fn network(&self) -> &Deferred<ClusterNetwork> {
        &self.parts.network
    }

    pub(crate) fn launch_api(&self) -> &dyn TaskLaunchApi {
        self.parts.launch_api.as_ref()
    }

    /// Launches one task from this definition.
    ///
    /// Every call starts a new, independent task.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the target container cannot be
    /// selected, a launch error if the platform reports per-task failures,
    /// or whatever error the network lookup or launch call produces.
    pub async fn run(&self, options: RunOptions) -> Result<()> {
        crate::launcher::launch(self, options).await
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("family", &self.parts.family)
            .field("arn", &self.parts.arn)
            .field("launch_kind", &self.parts.launch_kind)
            .field("cpu", &self.parts.cpu)
            .field("memory", &self.parts.memory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use stevedore_common::types::{ContainerSpec, LoadBalancerPort, RoleId, TrustPolicy};

    use super::*;
    use crate::backend::memory::InMemoryLaunchApi;

    fn role(name: &str) -> Role {
        Role {
            id: RoleId::new(name),
            name: name.into(),
            arn: format!("arn:aws:iam::1:role/{name}"),
            trust_policy: TrustPolicy::ecs_tasks(),
            policies: Vec::new(),
        }
    }

    fn parts(containers: ContainerSet) -> TaskDefinitionParts {
        TaskDefinitionParts {
            family: "svc".into(),
            arn: "arn:aws:ecs:us-east-1:1:task-definition/svc:1".into(),
            containers,
            container_definitions: Vec::new(),
            cpu: "256".into(),
            memory: "0.5GB".into(),
            roles: ProvisionedRoles {
                task: role("task"),
                execution: role("execution"),
            },
            network_mode: NetworkMode::Bridge,
            requires_compatibilities: vec![Compatibility::Ec2],
            launch_kind: LaunchKind::Ec2,
            load_balancer: None,
            log_group: LogGroup {
                name: "svc".into(),
                arn: "arn:aws:logs:us-east-1:1:log-group:svc".into(),
                retention_days: 1,
            },
            cluster_arn: "arn:aws:ecs:us-east-1:1:cluster/c".into(),
            network: Deferred::ready(ClusterNetwork {
                subnet_ids: Vec::new(),
                security_group_id: "sg".into(),
                uses_private_subnets: false,
            }),
            launch_api: Arc::new(InMemoryLaunchApi::new()),
            default_os: HostOs::Linux,
        }
    }

    #[test]
    fn new_accepts_single_load_balanced_container() {
        let set = ContainerSet::new(vec![
            ContainerSpec::new("web", "nginx").load_balancer_port(LoadBalancerPort::new(80)),
            ContainerSpec::new("worker", "app"),
        ])
        .unwrap();
        let def = TaskDefinition::new(parts(set)).unwrap();
        assert_eq!(def.family(), "svc");
        assert_eq!(def.containers().len(), 2);
    }

    #[test]
    fn new_rejects_two_load_balanced_containers() {
        let set = ContainerSet::new(vec![
            ContainerSpec::new("a", "x").load_balancer_port(LoadBalancerPort::new(80)),
            ContainerSpec::new("b", "y").load_balancer_port(LoadBalancerPort::new(81)),
        ])
        .unwrap();
        let err = TaskDefinition::new(parts(set)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn new_rejects_empty_container_set() {
        let err = TaskDefinition::new(parts(ContainerSet::default())).unwrap_err();
        assert!(err.is_configuration());
    }
}
