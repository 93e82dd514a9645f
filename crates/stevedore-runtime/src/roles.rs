//! Task and execution role resolution.
//!
//! Caller-supplied roles are used verbatim. Missing roles are created with a
//! trust policy for the platform's task principal and the default policy set
//! attached. Role names derive from the task definition family, so two
//! constructions under the same family must not run concurrently.

use sha2::{Digest, Sha256};
use stevedore_common::constants::{DEFAULT_TASK_POLICIES, TASK_EXECUTION_POLICY};
use stevedore_common::error::Result;
use stevedore_common::types::{Role, TrustPolicy};

use crate::backend::IdentityBackend;

/// Task and execution roles of one task definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRoles {
    /// Role assumed by the running containers.
    pub task: Role,
    /// Role assumed by the platform agent pulling images and shipping logs.
    pub execution: Role,
}

/// Resolves the roles of a single task definition construction.
pub struct RoleProvisioner<'a> {
    family: &'a str,
    identity: &'a dyn IdentityBackend,
}

impl<'a> RoleProvisioner<'a> {
    /// Creates a provisioner for the given family.
    #[must_use]
    pub fn new(family: &'a str, identity: &'a dyn IdentityBackend) -> Self {
        Self { family, identity }
    }

    /// Returns the supplied roles, creating whichever is missing.
    ///
    /// Consumes the provisioner: each role kind is created at most once per
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error if role creation or policy attachment fails.
    pub fn provision(self, task: Option<Role>, execution: Option<Role>) -> Result<ProvisionedRoles> {
        let task = match task {
            Some(role) => role,
            None => self.create_task_role()?,
        };
        let execution = match execution {
            Some(role) => role,
            None => self.create_execution_role()?,
        };
        Ok(ProvisionedRoles { task, execution })
    }

    fn create_task_role(&self) -> Result<Role> {
        let name = format!("{}-task", self.family);
        let mut role = self.identity.create_role(&name, &TrustPolicy::ecs_tasks())?;
        tracing::info!(role = %role.name, id = %role.id, "created task role");
        for policy in DEFAULT_TASK_POLICIES {
            let attachment = format!("{name}-{}", policy_digest(policy));
            self.identity.attach_policy(&attachment, &role, policy)?;
            role.policies.push((*policy).to_string());
        }
        Ok(role)
    }

    fn create_execution_role(&self) -> Result<Role> {
        let name = format!("{}-execution", self.family);
        let mut role = self.identity.create_role(&name, &TrustPolicy::ecs_tasks())?;
        tracing::info!(role = %role.name, id = %role.id, "created execution role");
        self.identity.attach_policy(&name, &role, TASK_EXECUTION_POLICY)?;
        role.policies.push(TASK_EXECUTION_POLICY.to_string());
        Ok(role)
    }
}

/// Short, stable digest used to name policy attachments.
fn policy_digest(policy: &str) -> String {
    Sha256::digest(policy.as_bytes())
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}
