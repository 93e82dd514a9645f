//! # stevedore-compose
//!
//! Pure composition logic for task definitions.
//!
//! Handles:
//! - **Validator**: At most one load-balanced container per set.
//! - **Sizing**: Default CPU/memory tiers from aggregate container demand.
//! - **Lowering**: ContainerSpec to the platform's container-definition shape.
//! - **Environment**: Baseline/override environment resolution for launches.
//! - **Placement**: Host OS placement constraints.
//!
//! Nothing in this crate performs I/O.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod environment;
pub mod lowering;
pub mod placement;
pub mod sizing;
pub mod validator;
