//! Platform constants, default policy sets, and sizing tier bounds.

/// Key under which the single-container shorthand stores its container.
pub const DEFAULT_CONTAINER_NAME: &str = "container";

/// Service principal of the platform's task agent.
pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Policy language version used in trust policies.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Managed policies attached to a default task role.
///
/// Wide access to serverless services plus the right to run tasks from
/// inside a task.
pub const DEFAULT_TASK_POLICIES: &[&str] = &[
    "arn:aws:iam::aws:policy/AWSLambdaFullAccess",
    "arn:aws:iam::aws:policy/AmazonEC2ContainerServiceFullAccess",
];

/// Managed policy attached to a default execution role.
pub const TASK_EXECUTION_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// Host attribute matched by OS placement constraints.
pub const OS_TYPE_ATTRIBUTE: &str = "ecs.os-type";

/// Placement constraint type used for attribute expressions.
pub const MEMBER_OF_CONSTRAINT: &str = "memberOf";

/// Log driver used for container log configuration.
pub const LOG_DRIVER: &str = "awslogs";

/// Retention of a log group created by default.
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 1;

/// Smallest memory tier in MiB.
pub const MIN_TASK_MEMORY_MIB: u32 = 512;

/// Smallest CPU tier in units.
pub const MIN_TASK_CPU_UNITS: u32 = 256;

/// Memory above which (MiB) a task needs at least the paired CPU units.
///
/// Checked in order; the first matching bound applies.
pub const CPU_FLOOR_BY_MEMORY: &[(u32, u32)] = &[(16384, 4096), (8192, 2048), (4096, 1024), (2048, 512)];

/// Binary name of the CLI, as shown in `--help` and `--version`.
pub const BIN_NAME: &str = "stv";
