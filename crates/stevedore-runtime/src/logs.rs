//! Log group resolution for task containers.

use stevedore_common::error::Result;
use stevedore_common::types::LogGroup;

use crate::backend::LogBackend;

/// Returns the supplied log group, or creates one named after the family.
///
/// # Errors
///
/// Returns a provisioning error if the default log group cannot be created.
pub fn resolve_log_group(
    family: &str,
    supplied: Option<LogGroup>,
    logs: &dyn LogBackend,
    retention_days: u32,
) -> Result<LogGroup> {
    if let Some(group) = supplied {
        tracing::debug!(log_group = %group.name, "using supplied log group");
        return Ok(group);
    }
    let group = logs.create_log_group(family, retention_days)?;
    tracing::info!(log_group = %group.name, retention_days, "created log group");
    Ok(group)
}
