//! End-to-end tests for the runtime pipeline against in-memory collaborators.
//!
//! Walks the same steps a builder takes, without the SDK on top:
//! 1. Resolve the log group and roles
//! 2. Lower and register the container definitions
//! 3. Launch tasks, resolving the cluster network per run

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use stevedore_common::constants::{DEFAULT_TASK_POLICIES, TASK_EXECUTION_POLICY};
use stevedore_common::error::StevedoreError;
use stevedore_common::types::{
    Compatibility, ContainerSet, ContainerSpec, HostOs, LaunchFailure, LaunchKind, NetworkMode,
    RunOptions,
};
use stevedore_compose::lowering::{LoweringContext, encode_definitions, lower_containers};
use stevedore_compose::sizing::compute_sizing;
use stevedore_runtime::backend::memory::{
    InMemoryCluster, InMemoryIdentity, InMemoryLaunchApi, InMemoryLogs, InMemoryRegistry,
};
use stevedore_runtime::backend::{Cluster, ClusterNetwork, RegisterTaskDefinition, TaskDefinitionRegistry};
use stevedore_runtime::deferred::Deferred;
use stevedore_runtime::definition::{TaskDefinition, TaskDefinitionParts};
use stevedore_runtime::logs::resolve_log_group;
use stevedore_runtime::roles::RoleProvisioner;

struct Pipeline {
    cluster: Arc<InMemoryCluster>,
    identity: InMemoryIdentity,
    logs: InMemoryLogs,
    registry: InMemoryRegistry,
    api: Arc<InMemoryLaunchApi>,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            cluster: Arc::new(InMemoryCluster::new("batch")),
            identity: InMemoryIdentity::new(),
            logs: InMemoryLogs::new(),
            registry: InMemoryRegistry::new(),
            api: Arc::new(InMemoryLaunchApi::new()),
        }
    }

    fn assemble(&self, family: &str, containers: ContainerSet) -> TaskDefinition {
        let log_group = resolve_log_group(family, None, &self.logs, 1).unwrap();
        let roles = RoleProvisioner::new(family, &self.identity).provision(None, None).unwrap();
        let container_definitions = lower_containers(
            &containers,
            &LoweringContext {
                log_group: &log_group.name,
                region: "eu-west-1",
                stream_prefix: "container",
                network_mode: NetworkMode::Awsvpc,
            },
        );
        let sizing = compute_sizing(&containers);
        let arn = self
            .registry
            .register(&RegisterTaskDefinition {
                family: family.to_string(),
                container_definitions: encode_definitions(&container_definitions).unwrap(),
                task_role_arn: roles.task.arn.clone(),
                execution_role_arn: roles.execution.arn.clone(),
                cpu: sizing.cpu(),
                memory: sizing.memory(),
                network_mode: NetworkMode::Awsvpc,
                requires_compatibilities: vec![Compatibility::Fargate],
            })
            .unwrap();

        let cluster = Arc::clone(&self.cluster);
        TaskDefinition::new(TaskDefinitionParts {
            family: family.to_string(),
            arn,
            containers,
            container_definitions,
            cpu: sizing.cpu(),
            memory: sizing.memory(),
            roles,
            network_mode: NetworkMode::Awsvpc,
            requires_compatibilities: vec![Compatibility::Fargate],
            launch_kind: LaunchKind::Fargate,
            load_balancer: None,
            log_group,
            cluster_arn: self.cluster.arn().to_string(),
            network: Deferred::new(move || {
                let cluster = Arc::clone(&cluster);
                async move { cluster.current_network().await }
            }),
            launch_api: self.api.clone(),
            default_os: HostOs::Linux,
        })
        .unwrap()
    }
}

fn worker_set() -> ContainerSet {
    ContainerSet::new(vec![
        ContainerSpec::new("worker", "worker:2").memory(1500).env("QUEUE", "default"),
        ContainerSpec::new("sidecar", "proxy:1").memory_reservation(128),
    ])
    .unwrap()
}

// ── Provisioning ─────────────────────────────────────────────────────

#[test]
fn pipeline_provisions_roles_logs_and_revision() {
    let pipeline = Pipeline::new();
    let def = pipeline.assemble("reports", worker_set());

    assert_eq!(def.arn(), "arn:aws:ecs:us-east-1:000000000000:task-definition/reports:1");
    assert_eq!(def.log_group().name, "reports");
    assert_eq!(def.task_role().policies, DEFAULT_TASK_POLICIES);
    assert_eq!(def.execution_role().policies, [TASK_EXECUTION_POLICY]);
    assert_eq!(pipeline.identity.attachments().len(), 3);
    assert_eq!(pipeline.logs.groups().len(), 1);
}

#[test]
fn pipeline_registers_computed_sizing_and_ordered_containers() {
    let pipeline = Pipeline::new();
    let def = pipeline.assemble("reports", worker_set());

    assert_eq!(def.memory(), "2GB");
    assert_eq!(def.cpu(), "256");
    let names: Vec<&str> = def.container_definitions().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["worker", "sidecar"]);

    let registered = &pipeline.registry.registered()[0];
    let decoded: serde_json::Value = serde_json::from_str(&registered.container_definitions).unwrap();
    assert_eq!(decoded[0]["name"], "worker");
    assert_eq!(decoded[0]["logConfiguration"]["options"]["awslogs-region"], "eu-west-1");
}

#[test]
fn pipeline_same_family_gets_new_revision() {
    let pipeline = Pipeline::new();
    let first = pipeline.assemble("reports", worker_set());
    let second = pipeline.assemble("reports", worker_set());
    assert!(first.arn().ends_with(":1"));
    assert!(second.arn().ends_with(":2"));
    assert_ne!(first.task_role().id, second.task_role().id);
}

// ── Launching ────────────────────────────────────────────────────────

#[tokio::test]
async fn pipeline_run_launches_independent_tasks() {
    let pipeline = Pipeline::new();
    let def = pipeline.assemble("reports", worker_set());

    def.run(RunOptions::new().env("DATE", "2026-10-19")).await.unwrap();
    def.run(RunOptions::new()).await.unwrap();

    let launched = pipeline.api.launched();
    assert_eq!(launched.len(), 2);
    assert_ne!(launched[0].task_arn, launched[1].task_arn);
    let overrides = &launched[0].request.container_overrides[0];
    assert_eq!(overrides.name, "worker");
    assert!(overrides.environment.iter().any(|kv| kv.name == "DATE"));
    assert!(
        !launched[1].request.container_overrides[0]
            .environment
            .iter()
            .any(|kv| kv.name == "DATE")
    );
}

#[tokio::test]
async fn pipeline_run_sees_network_changes() {
    let pipeline = Pipeline::new();
    let def = pipeline.assemble("reports", worker_set());

    def.run(RunOptions::new()).await.unwrap();
    pipeline.cluster.set_network(ClusterNetwork {
        subnet_ids: vec!["subnet-private-a".into(), "subnet-private-b".into()],
        security_group_id: "sg-locked".into(),
        uses_private_subnets: true,
    });
    def.run(RunOptions::new().os(HostOs::Windows)).await.unwrap();

    let requests = pipeline.api.requests();
    let first = requests[0].network_configuration.as_ref().unwrap();
    let second = requests[1].network_configuration.as_ref().unwrap();
    assert!(first.assign_public_ip);
    assert_eq!(second.subnets, ["subnet-private-a", "subnet-private-b"]);
    assert_eq!(second.security_groups, ["sg-locked"]);
    assert!(!second.assign_public_ip);
    assert_eq!(
        requests[1].placement_constraints[0].expression,
        "attribute:ecs.os-type == windows"
    );
}

#[tokio::test]
async fn pipeline_launch_failure_carries_platform_failures() {
    let pipeline = Pipeline::new();
    let def = pipeline.assemble("reports", worker_set());
    pipeline.api.script_failures(vec![LaunchFailure {
        arn: Some("arn:aws:ecs:us-east-1:000000000000:container-instance/x".into()),
        reason: "RESOURCE:MEMORY".into(),
        detail: None,
    }]);

    let err = def.run(RunOptions::new()).await.unwrap_err();
    assert!(err.is_launch());
    assert!(err.to_string().contains("RESOURCE:MEMORY"));
    match err {
        StevedoreError::Launch { failures } => assert_eq!(failures.len(), 1),
        other => panic!("unexpected error: {other}"),
    }
    assert!(pipeline.api.launched().is_empty());
}
