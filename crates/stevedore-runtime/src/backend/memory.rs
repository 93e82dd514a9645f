//! In-memory collaborators that record every call.
//!
//! Used for dry runs (the CLI renders task definitions against them) and
//! as test doubles. Failures can be injected per collaborator.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{
    LaunchFailure, LoadBalancerHandle, LoadBalancerPort, LogGroup, Role, RoleId, TrustPolicy,
};

use super::{
    Backends, Cluster, ClusterNetwork, IdentityBackend, LogBackend, RegisterTaskDefinition,
    RunTaskRequest, RunTaskResponse, TaskDefinitionRegistry, TaskLaunchApi,
};

const ACCOUNT_ID: &str = "000000000000";
const REGION: &str = "us-east-1";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cluster whose network can be changed between launches.
#[derive(Debug)]
pub struct InMemoryCluster {
    name: String,
    arn: String,
    network: Mutex<ClusterNetwork>,
    load_balancers: Mutex<Vec<LoadBalancerHandle>>,
    reject_load_balancers: bool,
    network_lookups: AtomicUsize,
}

impl InMemoryCluster {
    /// Creates a cluster with one public subnet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            arn: format!("arn:aws:ecs:{REGION}:{ACCOUNT_ID}:cluster/{name}"),
            name,
            network: Mutex::new(ClusterNetwork {
                subnet_ids: vec!["subnet-public-a".to_string()],
                security_group_id: "sg-default".to_string(),
                uses_private_subnets: false,
            }),
            load_balancers: Mutex::new(Vec::new()),
            reject_load_balancers: false,
            network_lookups: AtomicUsize::new(0),
        }
    }

    /// Replaces the initial network values.
    #[must_use]
    pub fn with_network(self, network: ClusterNetwork) -> Self {
        *lock(&self.network) = network;
        self
    }

    /// Makes every load balancer request fail.
    #[must_use]
    pub const fn rejecting_load_balancers(mut self) -> Self {
        self.reject_load_balancers = true;
        self
    }

    /// Changes the network seen by subsequent lookups.
    pub fn set_network(&self, network: ClusterNetwork) {
        *lock(&self.network) = network;
    }

    /// Load balancers created so far.
    #[must_use]
    pub fn load_balancers(&self) -> Vec<LoadBalancerHandle> {
        lock(&self.load_balancers).clone()
    }

    /// Number of network lookups performed.
    #[must_use]
    pub fn network_lookups(&self) -> usize {
        self.network_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Cluster for InMemoryCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn arn(&self) -> &str {
        &self.arn
    }

    fn create_load_balancer(&self, name: &str, port: &LoadBalancerPort) -> Result<LoadBalancerHandle> {
        if self.reject_load_balancers {
            return Err(StevedoreError::configuration(format!(
                "cluster \"{}\" cannot create load balancer \"{name}\"",
                self.name
            )));
        }
        let handle = LoadBalancerHandle {
            name: name.to_string(),
            arn: format!("arn:aws:elasticloadbalancing:{REGION}:{ACCOUNT_ID}:loadbalancer/{name}"),
            target_group_arn: format!(
                "arn:aws:elasticloadbalancing:{REGION}:{ACCOUNT_ID}:targetgroup/{name}/{}",
                port.target_port
            ),
            listener_port: port.listener_port(),
        };
        lock(&self.load_balancers).push(handle.clone());
        Ok(handle)
    }

    async fn current_network(&self) -> Result<ClusterNetwork> {
        let _ = self.network_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.network).clone())
    }
}

/// A recorded policy attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAttachment {
    /// Attachment resource name.
    pub name: String,
    /// Role the policy is attached to.
    pub role: String,
    /// Attached policy ARN.
    pub policy_arn: String,
}

/// Identity backend holding roles in memory.
#[derive(Debug, Default)]
pub struct InMemoryIdentity {
    roles: Mutex<Vec<Role>>,
    attachments: Mutex<Vec<PolicyAttachment>>,
    fail_role: Option<String>,
}

impl InMemoryIdentity {
    /// Creates an empty identity backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes creation of the named role fail.
    #[must_use]
    pub fn failing_role(mut self, name: impl Into<String>) -> Self {
        self.fail_role = Some(name.into());
        self
    }

    /// Roles created so far.
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        lock(&self.roles).clone()
    }

    /// Policy attachments made so far.
    #[must_use]
    pub fn attachments(&self) -> Vec<PolicyAttachment> {
        lock(&self.attachments).clone()
    }
}

impl IdentityBackend for InMemoryIdentity {
    fn create_role(&self, name: &str, trust_policy: &TrustPolicy) -> Result<Role> {
        if self.fail_role.as_deref() == Some(name) {
            return Err(StevedoreError::provisioning("role", format!("access denied creating {name}")));
        }
        let id = RoleId::generate();
        let role = Role {
            arn: format!("arn:aws:iam::{ACCOUNT_ID}:role/{name}-{}", &id.as_str()[..8]),
            id,
            name: name.to_string(),
            trust_policy: trust_policy.clone(),
            policies: Vec::new(),
        };
        lock(&self.roles).push(role.clone());
        Ok(role)
    }

    fn attach_policy(&self, attachment_name: &str, role: &Role, policy_arn: &str) -> Result<()> {
        lock(&self.attachments).push(PolicyAttachment {
            name: attachment_name.to_string(),
            role: role.name.clone(),
            policy_arn: policy_arn.to_string(),
        });
        Ok(())
    }
}

/// Log backend holding log groups in memory.
#[derive(Debug, Default)]
pub struct InMemoryLogs {
    groups: Mutex<Vec<LogGroup>>,
    fail: bool,
}

impl InMemoryLogs {
    /// Creates an empty log backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every log group creation fail.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Log groups created so far.
    #[must_use]
    pub fn groups(&self) -> Vec<LogGroup> {
        lock(&self.groups).clone()
    }
}

impl LogBackend for InMemoryLogs {
    fn create_log_group(&self, name: &str, retention_days: u32) -> Result<LogGroup> {
        if self.fail {
            return Err(StevedoreError::provisioning("log group", format!("quota exceeded for {name}")));
        }
        let group = LogGroup {
            name: name.to_string(),
            arn: format!("arn:aws:logs:{REGION}:{ACCOUNT_ID}:log-group:{name}"),
            retention_days,
        };
        lock(&self.groups).push(group.clone());
        Ok(group)
    }
}

/// Registry assigning increasing revisions per family.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    registered: Mutex<Vec<RegisterTaskDefinition>>,
    revisions: Mutex<HashMap<String, u32>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Task definitions registered so far.
    #[must_use]
    pub fn registered(&self) -> Vec<RegisterTaskDefinition> {
        lock(&self.registered).clone()
    }
}

impl TaskDefinitionRegistry for InMemoryRegistry {
    fn register(&self, definition: &RegisterTaskDefinition) -> Result<String> {
        let revision = {
            let mut revisions = lock(&self.revisions);
            let revision = revisions.entry(definition.family.clone()).or_insert(0);
            *revision += 1;
            *revision
        };
        lock(&self.registered).push(definition.clone());
        Ok(format!(
            "arn:aws:ecs:{REGION}:{ACCOUNT_ID}:task-definition/{}:{revision}",
            definition.family
        ))
    }
}

/// A task started by [`InMemoryLaunchApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedTask {
    /// Task ARN.
    pub task_arn: String,
    /// Request that started the task.
    pub request: RunTaskRequest,
    /// When the task was started.
    pub started_at: DateTime<Utc>,
}

/// Launch API starting fake tasks, with scriptable failures.
#[derive(Debug, Default)]
pub struct InMemoryLaunchApi {
    requests: Mutex<Vec<RunTaskRequest>>,
    launched: Mutex<Vec<LaunchedTask>>,
    scripted_failures: Mutex<VecDeque<Vec<LaunchFailure>>>,
}

impl InMemoryLaunchApi {
    /// Creates a launch API that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues failures for the next call. An empty list means success.
    pub fn script_failures(&self, failures: Vec<LaunchFailure>) {
        lock(&self.scripted_failures).push_back(failures);
    }

    /// Every request received, including failed ones.
    #[must_use]
    pub fn requests(&self) -> Vec<RunTaskRequest> {
        lock(&self.requests).clone()
    }

    /// Tasks successfully started.
    #[must_use]
    pub fn launched(&self) -> Vec<LaunchedTask> {
        lock(&self.launched).clone()
    }
}

#[async_trait]
impl TaskLaunchApi for InMemoryLaunchApi {
    async fn run_task(&self, request: RunTaskRequest) -> Result<RunTaskResponse> {
        lock(&self.requests).push(request.clone());
        let failures = lock(&self.scripted_failures).pop_front().unwrap_or_default();
        if !failures.is_empty() {
            return Ok(RunTaskResponse {
                tasks: Vec::new(),
                failures,
            });
        }
        let task_arn = format!(
            "arn:aws:ecs:{REGION}:{ACCOUNT_ID}:task/{}",
            uuid::Uuid::new_v4().simple()
        );
        lock(&self.launched).push(LaunchedTask {
            task_arn: task_arn.clone(),
            request,
            started_at: Utc::now(),
        });
        Ok(RunTaskResponse {
            tasks: vec![task_arn],
            failures: Vec::new(),
        })
    }
}

/// A full set of in-memory collaborators sharing one cluster.
#[derive(Debug, Clone)]
pub struct InMemoryPlatform {
    /// Cluster.
    pub cluster: Arc<InMemoryCluster>,
    /// Identity backend.
    pub identity: Arc<InMemoryIdentity>,
    /// Log backend.
    pub logs: Arc<InMemoryLogs>,
    /// Task definition registry.
    pub registry: Arc<InMemoryRegistry>,
    /// Launch API.
    pub launcher: Arc<InMemoryLaunchApi>,
}

impl InMemoryPlatform {
    /// Creates a platform around a fresh cluster.
    #[must_use]
    pub fn new(cluster_name: &str) -> Self {
        Self::with_cluster(InMemoryCluster::new(cluster_name))
    }

    /// Creates a platform around a preconfigured cluster.
    #[must_use]
    pub fn with_cluster(cluster: InMemoryCluster) -> Self {
        Self {
            cluster: Arc::new(cluster),
            identity: Arc::new(InMemoryIdentity::new()),
            logs: Arc::new(InMemoryLogs::new()),
            registry: Arc::new(InMemoryRegistry::new()),
            launcher: Arc::new(InMemoryLaunchApi::new()),
        }
    }

    /// Replaces the identity backend.
    #[must_use]
    pub fn with_identity(mut self, identity: InMemoryIdentity) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    /// Replaces the log backend.
    #[must_use]
    pub fn with_logs(mut self, logs: InMemoryLogs) -> Self {
        self.logs = Arc::new(logs);
        self
    }

    /// Returns trait-object handles to every collaborator.
    #[must_use]
    pub fn backends(&self) -> Backends {
        Backends {
            cluster: self.cluster.clone(),
            identity: self.identity.clone(),
            logs: self.logs.clone(),
            registry: self.registry.clone(),
            launcher: self.launcher.clone(),
        }
    }
}
