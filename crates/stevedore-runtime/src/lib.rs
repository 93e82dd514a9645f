//! Provisioning and launch plumbing for Stevedore task definitions.
//!
//! The platform itself sits behind the collaborator traits in [`backend`].
//! This crate resolves the supporting resources a task definition needs
//! ([`roles`], [`logs`]), holds the immutable [`definition::TaskDefinition`],
//! and launches one-shot tasks from it ([`launcher`]).

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod deferred;
pub mod definition;
pub mod launcher;
pub mod logs;
pub mod roles;
