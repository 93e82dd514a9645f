//! `stv render` — Render the task definition a manifest would register.
//!
//! Builds against in-memory collaborators, so nothing is provisioned. Roles
//! and the log group appear as they would be created by default.

use std::path::PathBuf;

use clap::Args;
use serde_json::{Value, json};
use stevedore_runtime::backend::RegisterTaskDefinition;
use stevedore_sdk::builder::{FargateTaskDefinitionBuilder, TaskDefinitionBuilder};
use stevedore_sdk::{InMemoryPlatform, NetworkMode};

/// Arguments for the `render` command.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the container manifest (YAML or JSON).
    #[arg(default_value = "stevedore.yaml")]
    pub file: PathBuf,

    /// Task definition family. Defaults to the manifest's name.
    #[arg(long)]
    pub name: Option<String>,

    /// Render a Fargate task definition (awsvpc, FARGATE).
    #[arg(long)]
    pub fargate: bool,

    /// Region for container log configuration.
    #[arg(long)]
    pub region: Option<String>,

    /// Explicit task CPU.
    #[arg(long)]
    pub cpu: Option<String>,

    /// Explicit task memory.
    #[arg(long)]
    pub memory: Option<String>,
}

/// Executes the `render` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or the task definition
/// fails to build.
pub fn execute(args: &RenderArgs) -> anyhow::Result<()> {
    let rendered = render(args)?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

fn render(args: &RenderArgs) -> anyhow::Result<Value> {
    let manifest = crate::manifest::load(&args.file)?;
    let name = args
        .name
        .clone()
        .or(manifest.name)
        .ok_or_else(|| anyhow::anyhow!("no family name: pass --name or set `name` in the manifest"))?;
    let mut config = manifest.config;
    if let Some(region) = &args.region {
        config.region.clone_from(region);
    }

    let platform = InMemoryPlatform::new("dry-run");
    let backends = platform.backends();
    let built = if args.fargate {
        let mut builder = FargateTaskDefinitionBuilder::new(&name)
            .containers(manifest.containers)
            .config(config);
        if let Some(cpu) = &args.cpu {
            builder = builder.cpu(cpu);
        }
        if let Some(memory) = &args.memory {
            builder = builder.memory(memory);
        }
        builder.build(&backends)
    } else {
        let mut builder = TaskDefinitionBuilder::new(&name)
            .containers(manifest.containers)
            .network_mode(NetworkMode::Bridge)
            .config(config);
        if let Some(cpu) = &args.cpu {
            builder = builder.cpu(cpu);
        }
        if let Some(memory) = &args.memory {
            builder = builder.memory(memory);
        }
        builder.build(&backends)
    };
    let definition = built.map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::debug!(family = definition.family(), arn = definition.arn(), "rendered task definition");

    let registered = platform
        .registry
        .registered()
        .pop()
        .ok_or_else(|| anyhow::anyhow!("task definition was not registered"))?;
    to_document(registered)
}

fn to_document(registered: RegisterTaskDefinition) -> anyhow::Result<Value> {
    let containers: Value = serde_json::from_str(&registered.container_definitions)?;
    let mut document = serde_json::to_value(&registered)?;
    document["containerDefinitions"] = containers;
    Ok(json!({ "taskDefinition": document }))
}
