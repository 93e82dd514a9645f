//! Domain primitive types used across the Stevedore workspace.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StevedoreError};

/// Transport protocol fronted by a load balancer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain TCP.
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// HTTP (terminated at the load balancer, TCP to the container).
    Http,
    /// HTTPS (terminated at the load balancer, TCP to the container).
    Https,
}

impl Protocol {
    /// Protocol used for the container-side port mapping.
    #[must_use]
    pub const fn container_protocol(self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp | Self::Http | Self::Https => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

/// Port information used to put a load balancer in front of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerPort {
    /// Port the container listens on and the load balancer forwards to.
    pub target_port: u16,
    /// Protocol spoken on the port.
    #[serde(default)]
    pub protocol: Protocol,
    /// Listener port exposed by the load balancer, when it differs from the target port.
    #[serde(default)]
    pub override_port: Option<u16>,
}

impl LoadBalancerPort {
    /// Creates a TCP load balancer port.
    #[must_use]
    pub const fn new(target_port: u16) -> Self {
        Self {
            target_port,
            protocol: Protocol::Tcp,
            override_port: None,
        }
    }

    /// Sets the protocol.
    #[must_use]
    pub const fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the listener port exposed by the load balancer.
    #[must_use]
    pub const fn override_port(mut self, port: u16) -> Self {
        self.override_port = Some(port);
        self
    }

    /// Port exposed by the load balancer listener.
    #[must_use]
    pub fn listener_port(&self) -> u16 {
        self.override_port.unwrap_or(self.target_port)
    }
}

/// Caller-supplied description of one container in a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name, unique within its set.
    pub name: String,
    /// Image reference.
    #[serde(default)]
    pub image: String,
    /// Command override.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Whether the task stops when this container stops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
    /// CPU units reserved for the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Hard memory limit in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Soft memory reservation in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<u32>,
    /// Baseline environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Port to put a load balancer in front of. At most one per set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_port: Option<LoadBalancerPort>,
}

impl ContainerSpec {
    /// Creates a container spec with the given name and image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }

    /// Sets the command to run.
    #[must_use]
    pub fn command(mut self, cmd: Vec<String>) -> Self {
        self.command = cmd;
        self
    }

    /// Marks the container as essential (or not).
    #[must_use]
    pub const fn essential(mut self, essential: bool) -> Self {
        self.essential = Some(essential);
        self
    }

    /// Sets the CPU units.
    #[must_use]
    pub const fn cpu(mut self, units: u32) -> Self {
        self.cpu = Some(units);
        self
    }

    /// Sets the hard memory limit in MiB.
    #[must_use]
    pub const fn memory(mut self, mib: u32) -> Self {
        self.memory = Some(mib);
        self
    }

    /// Sets the soft memory reservation in MiB.
    #[must_use]
    pub const fn memory_reservation(mut self, mib: u32) -> Self {
        self.memory_reservation = Some(mib);
        self
    }

    /// Adds a baseline environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.environment.insert(key.into(), value.into());
        self
    }

    /// Declares the load balancer port for this container.
    #[must_use]
    pub const fn load_balancer_port(mut self, port: LoadBalancerPort) -> Self {
        self.load_balancer_port = Some(port);
        self
    }

    /// Memory this container contributes to the task total, in MiB.
    ///
    /// The soft reservation wins over the hard limit when both are set.
    #[must_use]
    pub fn memory_demand(&self) -> u32 {
        self.memory_reservation.or(self.memory).unwrap_or(0)
    }
}

/// Ordered set of containers keyed by name.
///
/// Insertion order is the defined order; it decides which container the
/// launcher targets when the caller does not name one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ContainerSpec>", into = "Vec<ContainerSpec>")]
pub struct ContainerSet {
    containers: Vec<ContainerSpec>,
}

impl ContainerSet {
    /// Builds a set from an ordered list of specs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if two specs share a name or a name is empty.
    pub fn new(containers: Vec<ContainerSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &containers {
            if spec.name.is_empty() {
                return Err(StevedoreError::configuration("container name must not be empty"));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(StevedoreError::configuration(format!(
                    "duplicate container name: \"{}\"",
                    spec.name
                )));
            }
        }
        Ok(Self { containers })
    }

    /// Wraps a single container under the fixed default key.
    #[must_use]
    pub fn single(spec: ContainerSpec) -> Self {
        Self {
            containers: vec![ContainerSpec {
                name: constants::DEFAULT_CONTAINER_NAME.to_string(),
                ..spec
            }],
        }
    }

    /// Iterates containers in defined order.
    pub fn iter(&self) -> std::slice::Iter<'_, ContainerSpec> {
        self.containers.iter()
    }

    /// Returns the first container in defined order.
    #[must_use]
    pub fn first(&self) -> Option<&ContainerSpec> {
        self.containers.first()
    }

    /// Looks up a container by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Number of containers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether the set holds no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl TryFrom<Vec<ContainerSpec>> for ContainerSet {
    type Error = StevedoreError;

    fn try_from(containers: Vec<ContainerSpec>) -> Result<Self> {
        Self::new(containers)
    }
}

impl From<ContainerSet> for Vec<ContainerSpec> {
    fn from(set: ContainerSet) -> Self {
        set.containers
    }
}

impl<'a> IntoIterator for &'a ContainerSet {
    type Item = &'a ContainerSpec;
    type IntoIter = std::slice::Iter<'a, ContainerSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Principal allowed to assume a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Service principal name.
    #[serde(rename = "Service")]
    pub service: String,
}

/// One statement of a trust policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustStatement {
    /// Granted action.
    #[serde(rename = "Action")]
    pub action: String,
    /// Who may perform the action.
    #[serde(rename = "Principal")]
    pub principal: Principal,
    /// `Allow` or `Deny`.
    #[serde(rename = "Effect")]
    pub effect: String,
    /// Statement identifier.
    #[serde(rename = "Sid")]
    pub sid: String,
}

/// Assume-role policy document attached to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Policy language version.
    #[serde(rename = "Version")]
    pub version: String,
    /// Statements of the policy.
    #[serde(rename = "Statement")]
    pub statement: Vec<TrustStatement>,
}

impl TrustPolicy {
    /// Policy letting the platform's task principal assume the role.
    #[must_use]
    pub fn ecs_tasks() -> Self {
        Self {
            version: constants::POLICY_VERSION.to_string(),
            statement: vec![TrustStatement {
                action: "sts:AssumeRole".to_string(),
                principal: Principal {
                    service: constants::TASK_PRINCIPAL.to_string(),
                },
                effect: "Allow".to_string(),
                sid: String::new(),
            }],
        }
    }
}

/// Opaque identifier of an identity role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    /// Creates a role ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random role ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity role assumed by tasks or by the platform agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Opaque identifier assigned by the identity backend.
    pub id: RoleId,
    /// Role name.
    pub name: String,
    /// Role ARN referenced from task definitions.
    pub arn: String,
    /// Assume-role policy.
    pub trust_policy: TrustPolicy,
    /// Attached managed policy ARNs.
    pub policies: Vec<String>,
}

/// A provisioned log group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroup {
    /// Log group name.
    pub name: String,
    /// Log group ARN.
    pub arn: String,
    /// Retention in days.
    pub retention_days: u32,
}

/// A provisioned load balancer fronting one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerHandle {
    /// Load balancer name.
    pub name: String,
    /// Load balancer ARN.
    pub arn: String,
    /// Target group receiving traffic for the container.
    pub target_group_arn: String,
    /// Port the load balancer listens on.
    pub listener_port: u16,
}

/// Host operating system used in placement constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Linux hosts.
    #[default]
    Linux,
    /// Windows hosts.
    Windows,
}

impl HostOs {
    /// Attribute value used by the platform.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostOs {
    type Err = StevedoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(StevedoreError::configuration(format!(
                "unknown host OS \"{other}\" (expected linux or windows)"
            ))),
        }
    }
}

/// Docker networking mode of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// No networking.
    None,
    /// Docker bridge networking.
    #[default]
    Bridge,
    /// Task-level elastic network interface.
    Awsvpc,
    /// Host networking.
    Host,
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bridge => write!(f, "bridge"),
            Self::Awsvpc => write!(f, "awsvpc"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// Launch compatibility a task definition requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compatibility {
    /// Runs on container instances.
    #[serde(rename = "EC2")]
    Ec2,
    /// Runs on serverless capacity.
    #[serde(rename = "FARGATE")]
    Fargate,
}

/// How a task is launched, fixed per task definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaunchKind {
    /// Container instances managed by the cluster.
    #[default]
    #[serde(rename = "EC2")]
    Ec2,
    /// Serverless capacity.
    #[serde(rename = "FARGATE")]
    Fargate,
}

impl LaunchKind {
    /// Launch type string passed to the platform.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ec2 => "EC2",
            Self::Fargate => "FARGATE",
        }
    }

    /// Compatibility matching this launch kind.
    #[must_use]
    pub const fn compatibility(self) -> Compatibility {
        match self {
            Self::Ec2 => Compatibility::Ec2,
            Self::Fargate => Compatibility::Fargate,
        }
    }
}

impl fmt::Display for LaunchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-task failure reported by the launch API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchFailure {
    /// Resource the failure refers to, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// Failure reason code.
    pub reason: String,
    /// Additional detail, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-call options for launching a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Container to run. Defaults to the first container of the definition.
    pub container_name: Option<String>,
    /// Host OS to place the task on. Defaults to linux.
    pub os: Option<HostOs>,
    /// Environment overrides layered over the container's baseline.
    pub environment: BTreeMap<String, String>,
}

impl RunOptions {
    /// Creates empty run options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a specific container.
    #[must_use]
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    /// Selects the host OS.
    #[must_use]
    pub const fn os(mut self, os: HostOs) -> Self {
        self.os = Some(os);
        self
    }

    /// Adds an environment override. An empty value removes the variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.environment.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_demand_prefers_reservation() {
        let spec = ContainerSpec::new("web", "nginx")
            .memory(1024)
            .memory_reservation(256);
        assert_eq!(spec.memory_demand(), 256);
        assert_eq!(ContainerSpec::new("a", "b").memory(300).memory_demand(), 300);
        assert_eq!(ContainerSpec::new("a", "b").memory_demand(), 0);
    }

    #[test]
    fn container_set_rejects_duplicate_names() {
        let err = ContainerSet::new(vec![
            ContainerSpec::new("api", "img1"),
            ContainerSpec::new("api", "img2"),
        ])
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("duplicate container name"));
    }

    #[test]
    fn container_set_preserves_insertion_order() {
        let set = ContainerSet::new(vec![
            ContainerSpec::new("zeta", "img"),
            ContainerSpec::new("alpha", "img"),
        ])
        .unwrap();
        let names: Vec<&str> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(set.first().map(|c| c.name.as_str()), Some("zeta"));
    }

    #[test]
    fn single_container_uses_default_key() {
        let set = ContainerSet::single(ContainerSpec::new("ignored", "nginx"));
        assert_eq!(set.len(), 1);
        assert!(set.get(constants::DEFAULT_CONTAINER_NAME).is_some());
    }

    #[test]
    fn container_set_deserializes_from_yaml_list() {
        let yaml = r"
- name: web
  image: nginx
  memory: 512
  load_balancer_port:
    target_port: 80
    protocol: http
- name: worker
  image: busybox
  environment:
    MODE: batch
";
        let set: ContainerSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(set.len(), 2);
        let web = set.get("web").unwrap();
        assert_eq!(web.load_balancer_port.map(|p| p.protocol), Some(Protocol::Http));
        assert_eq!(
            set.get("worker").unwrap().environment.get("MODE").map(String::as_str),
            Some("batch")
        );
    }

    #[test]
    fn container_set_deserialization_rejects_duplicates() {
        let yaml = "- name: a\n  image: x\n- name: a\n  image: y\n";
        assert!(serde_yaml::from_str::<ContainerSet>(yaml).is_err());
    }

    #[test]
    fn trust_policy_serializes_platform_shape() {
        let json = serde_json::to_value(TrustPolicy::ecs_tasks()).unwrap();
        assert_eq!(json["Version"], "2012-10-17");
        assert_eq!(json["Statement"][0]["Principal"]["Service"], "ecs-tasks.amazonaws.com");
        assert_eq!(json["Statement"][0]["Action"], "sts:AssumeRole");
    }

    #[test]
    fn host_os_parses_and_displays() {
        assert_eq!("windows".parse::<HostOs>().unwrap(), HostOs::Windows);
        assert!("solaris".parse::<HostOs>().is_err());
        assert_eq!(HostOs::default().to_string(), "linux");
    }

    #[test]
    fn listener_port_defaults_to_target() {
        assert_eq!(LoadBalancerPort::new(8080).listener_port(), 8080);
        assert_eq!(LoadBalancerPort::new(8080).override_port(80).listener_port(), 80);
    }
}
