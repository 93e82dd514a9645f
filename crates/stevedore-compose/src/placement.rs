//! Placement constraints restricting which hosts may run a task.

use serde::{Deserialize, Serialize};
use stevedore_common::constants::{MEMBER_OF_CONSTRAINT, OS_TYPE_ATTRIBUTE};
use stevedore_common::types::HostOs;

/// A placement constraint as sent to the launch API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConstraint {
    /// Constraint type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Cluster query language expression.
    pub expression: String,
}

/// Constraints pinning a task to hosts running `os` (linux when unset).
#[must_use]
pub fn constraints_for_host(os: Option<HostOs>) -> Vec<PlacementConstraint> {
    let os = os.unwrap_or_default();
    vec![PlacementConstraint {
        kind: MEMBER_OF_CONSTRAINT.to_string(),
        expression: format!("attribute:{OS_TYPE_ATTRIBUTE} == {os}"),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_os_defaults_to_linux() {
        let constraints = constraints_for_host(None);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].kind, "memberOf");
        assert_eq!(constraints[0].expression, "attribute:ecs.os-type == linux");
    }

    #[test]
    fn windows_uses_same_attribute_key() {
        let constraints = constraints_for_host(Some(HostOs::Windows));
        assert_eq!(constraints[0].expression, "attribute:ecs.os-type == windows");
    }

    #[test]
    fn constraint_serializes_type_field() {
        let json = serde_json::to_value(&constraints_for_host(None)[0]).unwrap();
        assert_eq!(json["type"], "memberOf");
    }
}
