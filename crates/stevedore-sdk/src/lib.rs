//! # stevedore-sdk
//!
//! Public SDK for composing task definitions and launching one-shot tasks.
//!
//! Provides two entry points:
//! - [`TaskDefinitionBuilder`](builder::TaskDefinitionBuilder): any launch kind, caller-chosen networking.
//! - [`FargateTaskDefinitionBuilder`](builder::FargateTaskDefinitionBuilder): `awsvpc` + `FARGATE`, with a
//!   single-container shorthand.
//!
//! Both register a [`TaskDefinition`] whose `run` launches a new task on every call.
//!
//! # Example
//!
//! ```rust,no_run
//! use stevedore_sdk::builder::FargateTaskDefinitionBuilder;
//! use stevedore_sdk::{ContainerSpec, InMemoryPlatform, RunOptions};
//!
//! # async fn demo() -> stevedore_sdk::Result<()> {
//! let platform = InMemoryPlatform::new("default");
//! let task = FargateTaskDefinitionBuilder::new("nightly-report")
//!     .container(ContainerSpec::new("report", "reporter:latest").memory(700))
//!     .build(&platform.backends())?;
//! task.run(RunOptions::new().env("DATE", "2026-10-19")).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;

pub use stevedore_common::config::StevedoreConfig;
pub use stevedore_common::error::{Result, StevedoreError};
pub use stevedore_common::types::{
    Compatibility, ContainerSet, ContainerSpec, HostOs, LaunchFailure, LaunchKind, LoadBalancerPort,
    LogGroup, NetworkMode, Protocol, Role, RunOptions,
};
pub use stevedore_runtime::backend::memory::InMemoryPlatform;
pub use stevedore_runtime::backend::{Backends, ClusterNetwork};
pub use stevedore_runtime::definition::TaskDefinition;
