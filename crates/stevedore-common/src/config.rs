//! Configuration model applied to task definition construction.

use serde::{Deserialize, Serialize};

use crate::types::HostOs;

/// Root configuration for building and launching task definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StevedoreConfig {
    /// Region written into container log configuration.
    pub region: String,
    /// Retention applied to log groups created by default.
    pub log_retention_days: u32,
    /// Stream prefix written into container log configuration.
    pub log_stream_prefix: String,
    /// Host OS used when a run does not name one.
    pub default_os: HostOs,
}

impl Default for StevedoreConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            log_retention_days: crate::constants::DEFAULT_LOG_RETENTION_DAYS,
            log_stream_prefix: crate::constants::DEFAULT_CONTAINER_NAME.to_string(),
            default_os: HostOs::Linux,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: StevedoreConfig = serde_json::from_str(r#"{"region":"eu-west-1"}"#).unwrap();
        assert_eq!(cfg.region, "eu-west-1");
        assert_eq!(cfg.log_retention_days, 1);
        assert_eq!(cfg.default_os, HostOs::Linux);
    }
}
