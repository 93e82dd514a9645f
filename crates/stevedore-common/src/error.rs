//! Unified error types for the Stevedore workspace.
//!
//! Construction-time failures ([`StevedoreError::Configuration`] and
//! [`StevedoreError::Provisioning`]) abort a task definition build entirely.
//! Launch-time failures ([`StevedoreError::Launch`] and
//! [`StevedoreError::Network`]) abort only the one `run` call that hit them.

use thiserror::Error;

use crate::types::LaunchFailure;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StevedoreError {
    /// Caller input violates an invariant of the container set or builder.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A collaborator failed to create a supporting resource.
    #[error("failed to provision {resource}: {message}")]
    Provisioning {
        /// Kind of resource being provisioned (role, log group, ...).
        resource: &'static str,
        /// Description of the backend failure.
        message: String,
    },

    /// The platform accepted the launch call but reported per-task failures.
    #[error("failed to start task: {}", describe_failures(failures))]
    Launch {
        /// Raw failure list returned by the platform.
        failures: Vec<LaunchFailure>,
    },

    /// The launch call itself could not be completed.
    #[error("platform request failed: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl StevedoreError {
    /// Builds a [`StevedoreError::Configuration`] from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Builds a [`StevedoreError::Provisioning`] for the given resource kind.
    pub fn provisioning(resource: &'static str, message: impl Into<String>) -> Self {
        Self::Provisioning {
            resource,
            message: message.into(),
        }
    }

    /// Returns `true` for caller input errors.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` for supporting-resource creation failures.
    #[must_use]
    pub const fn is_provisioning(&self) -> bool {
        matches!(self, Self::Provisioning { .. })
    }

    /// Returns `true` when the platform reported per-task launch failures.
    #[must_use]
    pub const fn is_launch(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}

fn describe_failures(failures: &[LaunchFailure]) -> String {
    serde_json::to_string(failures).unwrap_or_else(|_| format!("{} failure(s)", failures.len()))
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StevedoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_error_carries_raw_failures_in_message() {
        let err = StevedoreError::Launch {
            failures: vec![LaunchFailure {
                arn: Some("arn:aws:ecs:us-east-1:1:container-instance/abc".into()),
                reason: "RESOURCE:MEMORY".into(),
                detail: None,
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to start task:"), "got: {msg}");
        assert!(msg.contains("RESOURCE:MEMORY"), "got: {msg}");
        assert!(err.is_launch());
    }

    #[test]
    fn classification_helpers_match_variants() {
        assert!(StevedoreError::configuration("x").is_configuration());
        assert!(StevedoreError::provisioning("role", "denied").is_provisioning());
        assert!(!StevedoreError::configuration("x").is_launch());
    }

    #[test]
    fn provisioning_error_names_resource() {
        let err = StevedoreError::provisioning("log group", "throttled");
        assert_eq!(err.to_string(), "failed to provision log group: throttled");
    }
}
