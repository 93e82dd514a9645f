//! Fluent API for composing and registering task definitions.

use std::sync::Arc;

use stevedore_common::config::StevedoreConfig;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{
    Compatibility, ContainerSet, ContainerSpec, LaunchKind, LoadBalancerHandle, LogGroup,
    NetworkMode, Role,
};
use stevedore_compose::lowering::{LoweringContext, encode_definitions, lower_containers};
use stevedore_compose::sizing::compute_sizing;
use stevedore_compose::validator::validate;
use stevedore_runtime::backend::{Backends, RegisterTaskDefinition};
use stevedore_runtime::deferred::Deferred;
use stevedore_runtime::definition::{TaskDefinition, TaskDefinitionParts};
use stevedore_runtime::logs::resolve_log_group;
use stevedore_runtime::roles::RoleProvisioner;

/// Builder for a task definition of either launch kind.
#[derive(Debug)]
pub struct TaskDefinitionBuilder {
    name: String,
    containers: Vec<ContainerSpec>,
    cpu: Option<String>,
    memory: Option<String>,
    task_role: Option<Role>,
    execution_role: Option<Role>,
    log_group: Option<LogGroup>,
    network_mode: NetworkMode,
    requires_compatibilities: Vec<Compatibility>,
    launch_kind: LaunchKind,
    config: StevedoreConfig,
}

impl TaskDefinitionBuilder {
    /// Creates a builder for an EC2 task definition with bridge networking.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
            cpu: None,
            memory: None,
            task_role: None,
            execution_role: None,
            log_group: None,
            network_mode: NetworkMode::Bridge,
            requires_compatibilities: Vec::new(),
            launch_kind: LaunchKind::Ec2,
            config: StevedoreConfig::default(),
        }
    }

    /// Appends a container.
    #[must_use]
    pub fn container(mut self, spec: ContainerSpec) -> Self {
        self.containers.push(spec);
        self
    }

    /// Appends every container of a set, in order.
    #[must_use]
    pub fn containers(mut self, set: ContainerSet) -> Self {
        self.containers.extend(Vec::from(set));
        self
    }

    /// Sets the task CPU instead of computing it.
    #[must_use]
    pub fn cpu(mut self, cpu: impl Into<String>) -> Self {
        self.cpu = Some(cpu.into());
        self
    }

    /// Sets the task memory instead of computing it.
    #[must_use]
    pub fn memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }

    /// Uses an existing task role instead of creating one.
    #[must_use]
    pub fn task_role(mut self, role: Role) -> Self {
        self.task_role = Some(role);
        self
    }

    /// Uses an existing execution role instead of creating one.
    #[must_use]
    pub fn execution_role(mut self, role: Role) -> Self {
        self.execution_role = Some(role);
        self
    }

    /// Uses an existing log group instead of creating one.
    #[must_use]
    pub fn log_group(mut self, group: LogGroup) -> Self {
        self.log_group = Some(group);
        self
    }

    /// Sets the network mode.
    #[must_use]
    pub const fn network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = mode;
        self
    }

    /// Sets the required launch compatibilities.
    ///
    /// Defaults to the compatibility of the launch kind.
    #[must_use]
    pub fn requires_compatibilities(mut self, compatibilities: Vec<Compatibility>) -> Self {
        self.requires_compatibilities = compatibilities;
        self
    }

    /// Sets the launch kind passed to every run.
    #[must_use]
    pub const fn launch_kind(mut self, kind: LaunchKind) -> Self {
        self.launch_kind = kind;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: StevedoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Provisions supporting resources and registers the task definition.
    ///
    /// Nothing is returned unless every step succeeds. Resources created
    /// before a failing step are left to the backends to clean up.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty or invalid container set
    /// (or a load balancer the cluster cannot satisfy), and a provisioning
    /// error if a collaborator fails to create a supporting resource.
    pub fn build(self, backends: &Backends) -> Result<TaskDefinition> {
        let Self {
            name,
            containers,
            cpu,
            memory,
            task_role,
            execution_role,
            log_group,
            network_mode,
            mut requires_compatibilities,
            launch_kind,
            config,
        } = self;
        tracing::info!(family = %name, launch_kind = %launch_kind, "building task definition");

        let containers = ContainerSet::new(containers)?;
        if containers.is_empty() {
            return Err(StevedoreError::configuration(format!(
                "task definition \"{name}\" has no containers"
            )));
        }
        if requires_compatibilities.is_empty() {
            requires_compatibilities.push(launch_kind.compatibility());
        }

        let log_group = resolve_log_group(&name, log_group, backends.logs.as_ref(), config.log_retention_days)?;

        let load_balanced = validate(&containers)?
            .and_then(|(container, spec)| spec.load_balancer_port.map(|port| (container, port)));
        let load_balancer: Option<LoadBalancerHandle> = match load_balanced {
            Some((container, port)) => {
                let handle = backends
                    .cluster
                    .create_load_balancer(&format!("{name}-{container}"), &port)?;
                tracing::info!(load_balancer = %handle.name, container, "created load balancer");
                Some(handle)
            }
            None => None,
        };

        let roles = RoleProvisioner::new(&name, backends.identity.as_ref()).provision(task_role, execution_role)?;

        let container_definitions = lower_containers(
            &containers,
            &LoweringContext {
                log_group: &log_group.name,
                region: &config.region,
                stream_prefix: &config.log_stream_prefix,
                network_mode,
            },
        );

        let (cpu, memory) = match (cpu, memory) {
            (Some(cpu), Some(memory)) => (cpu, memory),
            (cpu, memory) => {
                let sizing = compute_sizing(&containers);
                tracing::debug!(family = %name, %sizing, "using computed sizing");
                (cpu.unwrap_or_else(|| sizing.cpu()), memory.unwrap_or_else(|| sizing.memory()))
            }
        };

        let arn = backends.registry.register(&RegisterTaskDefinition {
            family: name.clone(),
            container_definitions: encode_definitions(&container_definitions)?,
            task_role_arn: roles.task.arn.clone(),
            execution_role_arn: roles.execution.arn.clone(),
            cpu: cpu.clone(),
            memory: memory.clone(),
            network_mode,
            requires_compatibilities: requires_compatibilities.clone(),
        })?;
        tracing::info!(family = %name, arn = %arn, cpu = %cpu, memory = %memory, "registered task definition");

        let cluster = Arc::clone(&backends.cluster);
        let network = Deferred::new(move || {
            let cluster = Arc::clone(&cluster);
            async move { cluster.current_network().await }
        });

        TaskDefinition::new(TaskDefinitionParts {
            family: name,
            arn,
            containers,
            container_definitions,
            cpu,
            memory,
            roles,
            network_mode,
            requires_compatibilities,
            launch_kind,
            load_balancer,
            log_group,
            cluster_arn: backends.cluster.arn().to_string(),
            network,
            launch_api: Arc::clone(&backends.launcher),
            default_os: config.default_os,
        })
    }
}

/// Builder for Fargate task definitions.
///
/// Fixes `awsvpc` networking and the `FARGATE` compatibility, and accepts a
/// single container as shorthand for a one-container set.
#[derive(Debug)]
pub struct FargateTaskDefinitionBuilder {
    name: String,
    container: Option<ContainerSpec>,
    containers: Option<ContainerSet>,
    cpu: Option<String>,
    memory: Option<String>,
    task_role: Option<Role>,
    execution_role: Option<Role>,
    log_group: Option<LogGroup>,
    config: StevedoreConfig,
}

impl FargateTaskDefinitionBuilder {
    /// Creates a Fargate builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: None,
            containers: None,
            cpu: None,
            memory: None,
            task_role: None,
            execution_role: None,
            log_group: None,
            config: StevedoreConfig::default(),
        }
    }

    /// Runs a single container, stored under the default container key.
    #[must_use]
    pub fn container(mut self, spec: ContainerSpec) -> Self {
        self.container = Some(spec);
        self
    }

    /// Runs a set of containers. Takes precedence over [`Self::container`].
    #[must_use]
    pub fn containers(mut self, set: ContainerSet) -> Self {
        self.containers = Some(set);
        self
    }

    /// Sets the task CPU instead of computing it.
    #[must_use]
    pub fn cpu(mut self, cpu: impl Into<String>) -> Self {
        self.cpu = Some(cpu.into());
        self
    }

    /// Sets the task memory instead of computing it.
    #[must_use]
    pub fn memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }

    /// Uses an existing task role.
    #[must_use]
    pub fn task_role(mut self, role: Role) -> Self {
        self.task_role = Some(role);
        self
    }

    /// Uses an existing execution role.
    #[must_use]
    pub fn execution_role(mut self, role: Role) -> Self {
        self.execution_role = Some(role);
        self
    }

    /// Uses an existing log group.
    #[must_use]
    pub fn log_group(mut self, group: LogGroup) -> Self {
        self.log_group = Some(group);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: StevedoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the Fargate task definition.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if neither a container nor a container
    /// set was supplied, plus every error of [`TaskDefinitionBuilder::build`].
    pub fn build(self, backends: &Backends) -> Result<TaskDefinition> {
        let containers = match (self.containers, self.container) {
            (Some(set), _) => set,
            (None, Some(spec)) => ContainerSet::single(spec),
            (None, None) => {
                return Err(StevedoreError::configuration(
                    "either a container or a container set must be provided",
                ));
            }
        };

        let mut inner = TaskDefinitionBuilder::new(self.name)
            .containers(containers)
            .network_mode(NetworkMode::Awsvpc)
            .requires_compatibilities(vec![Compatibility::Fargate])
            .launch_kind(LaunchKind::Fargate)
            .config(self.config);
        if let Some(cpu) = self.cpu {
            inner = inner.cpu(cpu);
        }
        if let Some(memory) = self.memory {
            inner = inner.memory(memory);
        }
        if let Some(role) = self.task_role {
            inner = inner.task_role(role);
        }
        if let Some(role) = self.execution_role {
            inner = inner.execution_role(role);
        }
        if let Some(group) = self.log_group {
            inner = inner.log_group(group);
        }
        inner.build(backends)
    }
}

#[cfg(test)]
mod tests {
    use stevedore_common::constants::DEFAULT_CONTAINER_NAME;
    use stevedore_common::types::{LoadBalancerPort, TrustPolicy};
    use stevedore_runtime::backend::IdentityBackend;
    use stevedore_runtime::backend::memory::{InMemoryCluster, InMemoryIdentity, InMemoryLogs, InMemoryPlatform};

    use super::*;

    #[test]
    fn build_registers_computed_sizing_and_roles() {
        let platform = InMemoryPlatform::new("default");
        let def = TaskDefinitionBuilder::new("api")
            .container(ContainerSpec::new("web", "nginx").cpu(300).memory(700))
            .build(&platform.backends())
            .unwrap();

        assert_eq!(def.cpu(), "512");
        assert_eq!(def.memory(), "1GB");
        assert_eq!(def.task_role().name, "api-task");
        assert_eq!(def.execution_role().name, "api-execution");
        assert_eq!(def.requires_compatibilities(), [Compatibility::Ec2]);
        assert_eq!(def.log_group().name, "api");
        assert_eq!(def.log_group().retention_days, 1);

        let registered = platform.registry.registered();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].family, "api");
        assert_eq!(registered[0].task_role_arn, def.task_role().arn);
        assert!(registered[0].container_definitions.contains("\"awslogs-group\":\"api\""));
    }

    #[test]
    fn explicit_values_skip_provisioning() {
        let platform = InMemoryPlatform::new("default");
        let role = platform
            .identity
            .create_role("shared", &TrustPolicy::ecs_tasks())
            .unwrap();
        let group = LogGroup {
            name: "shared-logs".into(),
            arn: "arn:aws:logs:us-east-1:1:log-group:shared-logs".into(),
            retention_days: 7,
        };
        let def = TaskDefinitionBuilder::new("api")
            .container(ContainerSpec::new("web", "nginx").memory(700))
            .task_role(role.clone())
            .execution_role(role)
            .log_group(group)
            .cpu("2048")
            .build(&platform.backends())
            .unwrap();

        assert_eq!(def.cpu(), "2048");
        assert_eq!(def.memory(), "1GB");
        assert_eq!(def.log_group().name, "shared-logs");
        assert!(platform.logs.groups().is_empty());
        assert_eq!(platform.identity.roles().len(), 1);
    }

    #[test]
    fn load_balanced_container_gets_load_balancer() {
        let platform = InMemoryPlatform::new("default");
        let def = TaskDefinitionBuilder::new("site")
            .container(ContainerSpec::new("web", "nginx").load_balancer_port(LoadBalancerPort::new(80)))
            .container(ContainerSpec::new("sidecar", "envoy"))
            .build(&platform.backends())
            .unwrap();

        assert_eq!(def.load_balancer().map(|lb| lb.name.as_str()), Some("site-web"));
        assert_eq!(platform.cluster.load_balancers().len(), 1);
    }

    #[test]
    fn two_load_balanced_containers_abort_before_roles() {
        let platform = InMemoryPlatform::new("default");
        let err = TaskDefinitionBuilder::new("site")
            .container(ContainerSpec::new("a", "img").load_balancer_port(LoadBalancerPort::new(80)))
            .container(ContainerSpec::new("b", "img").load_balancer_port(LoadBalancerPort::new(81)))
            .build(&platform.backends())
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(platform.identity.roles().is_empty());
        assert!(platform.registry.registered().is_empty());
    }

    #[test]
    fn cluster_rejecting_load_balancer_is_configuration_error() {
        let platform = InMemoryPlatform::with_cluster(InMemoryCluster::new("default").rejecting_load_balancers());
        let err = TaskDefinitionBuilder::new("site")
            .container(ContainerSpec::new("web", "nginx").load_balancer_port(LoadBalancerPort::new(80)))
            .build(&platform.backends())
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(platform.registry.registered().is_empty());
    }

    #[test]
    fn provisioning_failures_abort_build() {
        let logs_down = InMemoryPlatform::new("default").with_logs(InMemoryLogs::new().failing());
        let err = TaskDefinitionBuilder::new("api")
            .container(ContainerSpec::new("web", "nginx"))
            .build(&logs_down.backends())
            .unwrap_err();
        assert!(err.is_provisioning());

        let iam_down =
            InMemoryPlatform::new("default").with_identity(InMemoryIdentity::new().failing_role("api-task"));
        let err = TaskDefinitionBuilder::new("api")
            .container(ContainerSpec::new("web", "nginx"))
            .build(&iam_down.backends())
            .unwrap_err();
        assert!(err.is_provisioning());
        assert!(iam_down.registry.registered().is_empty());
    }

    #[test]
    fn empty_container_set_is_rejected() {
        let platform = InMemoryPlatform::new("default");
        let err = TaskDefinitionBuilder::new("api").build(&platform.backends()).unwrap_err();
        assert!(err.is_configuration());
        assert!(platform.logs.groups().is_empty());
    }

    #[test]
    fn same_name_twice_gets_distinct_roles() {
        let platform = InMemoryPlatform::new("default");
        let first = TaskDefinitionBuilder::new("api")
            .container(ContainerSpec::new("web", "nginx"))
            .build(&platform.backends())
            .unwrap();
        let second = TaskDefinitionBuilder::new("api")
            .container(ContainerSpec::new("web", "nginx"))
            .build(&platform.backends())
            .unwrap();
        assert_ne!(first.task_role().id, second.task_role().id);
        assert_ne!(first.arn(), second.arn());
    }

    #[test]
    fn fargate_fixes_network_and_compatibility() {
        let platform = InMemoryPlatform::new("default");
        let def = FargateTaskDefinitionBuilder::new("job")
            .container(ContainerSpec::new("anything", "busybox").memory(2049))
            .build(&platform.backends())
            .unwrap();

        assert_eq!(def.network_mode(), NetworkMode::Awsvpc);
        assert_eq!(def.requires_compatibilities(), [Compatibility::Fargate]);
        assert_eq!(def.launch_kind(), LaunchKind::Fargate);
        assert!(def.containers().get(DEFAULT_CONTAINER_NAME).is_some());
        assert_eq!(def.memory(), "3GB");
        assert_eq!(def.cpu(), "512");
    }

    #[test]
    fn fargate_prefers_container_set() {
        let platform = InMemoryPlatform::new("default");
        let set = ContainerSet::new(vec![ContainerSpec::new("a", "img"), ContainerSpec::new("b", "img")]).unwrap();
        let def = FargateTaskDefinitionBuilder::new("job")
            .container(ContainerSpec::new("ignored", "img"))
            .containers(set)
            .build(&platform.backends())
            .unwrap();
        assert_eq!(def.containers().len(), 2);
    }

    #[test]
    fn fargate_without_containers_fails() {
        let platform = InMemoryPlatform::new("default");
        let err = FargateTaskDefinitionBuilder::new("job").build(&platform.backends()).unwrap_err();
        assert!(err.is_configuration());
    }
}
