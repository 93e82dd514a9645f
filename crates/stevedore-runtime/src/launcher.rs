//! One-shot task launches from a registered task definition.

use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerSet, ContainerSpec, LaunchKind, NetworkMode, RunOptions};
use stevedore_compose::environment::resolve_environment;
use stevedore_compose::lowering::encode_environment;
use stevedore_compose::placement::constraints_for_host;

use crate::backend::{AwsVpcConfiguration, ClusterNetwork, ContainerOverride, RunTaskRequest};
use crate::definition::TaskDefinition;

/// Picks the container a run targets.
///
/// # Errors
///
/// Returns a configuration error if the named container does not exist or
/// the set is empty.
pub fn select_container<'a>(containers: &'a ContainerSet, name: Option<&str>) -> Result<&'a ContainerSpec> {
    match name {
        Some(name) => containers.get(name).ok_or_else(|| {
            StevedoreError::configuration(format!("no container named \"{name}\" in task definition"))
        }),
        None => containers
            .first()
            .ok_or_else(|| StevedoreError::configuration("no valid container name found to run task for")),
    }
}

/// Builds the launch request for one run against the given network values.
///
/// # Errors
///
/// Returns a configuration error if the target container cannot be selected.
pub fn build_request(
    definition: &TaskDefinition,
    options: &RunOptions,
    network: ClusterNetwork,
) -> Result<RunTaskRequest> {
    let container = select_container(definition.containers(), options.container_name.as_deref())?;
    let environment = resolve_environment(&container.environment, &options.environment);
    let os = options.os.unwrap_or_else(|| definition.default_os());
    let launch_kind = definition.launch_kind();

    let network_configuration = (definition.network_mode() == NetworkMode::Awsvpc).then(|| {
        AwsVpcConfiguration {
            assign_public_ip: launch_kind == LaunchKind::Fargate && !network.uses_private_subnets,
            security_groups: vec![network.security_group_id],
            subnets: network.subnet_ids,
        }
    });

    Ok(RunTaskRequest {
        cluster: definition.cluster_arn().to_string(),
        task_definition: definition.arn().to_string(),
        placement_constraints: constraints_for_host(Some(os)),
        launch_type: launch_kind,
        network_configuration,
        container_overrides: vec![ContainerOverride {
            name: container.name.clone(),
            environment: encode_environment(&environment),
        }],
    })
}

/// Launches one task and fails if the platform reports any per-task failure.
///
/// The target container is checked before anything remote is called. The
/// cluster network is then looked up on every call so subnet or security
/// group changes made after construction are picked up.
///
/// # Errors
///
/// Returns a configuration error for an unknown target container, a launch
/// error carrying the raw failure list, or the network lookup / launch call
/// error unchanged.
pub async fn launch(definition: &TaskDefinition, options: RunOptions) -> Result<()> {
    let _ = select_container(definition.containers(), options.container_name.as_deref())?;
    let network = definition.network().resolve().await?;
    let request = build_request(definition, &options, network)?;
    let container = request
        .container_overrides
        .first()
        .map(|o| o.name.clone())
        .unwrap_or_default();

    tracing::info!(
        family = definition.family(),
        container = %container,
        launch_type = %request.launch_type,
        "launching task"
    );
    let response = definition.launch_api().run_task(request).await?;

    if !response.failures.is_empty() {
        tracing::warn!(
            family = definition.family(),
            failures = response.failures.len(),
            "platform reported task failures"
        );
        return Err(StevedoreError::Launch {
            failures: response.failures,
        });
    }

    tracing::info!(family = definition.family(), tasks = ?response.tasks, "task started");
    Ok(())
}
