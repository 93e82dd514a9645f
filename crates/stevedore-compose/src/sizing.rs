//! Default task sizing from aggregate container demand.
//!
//! Fargate only accepts discrete (cpu, memory) pairs. The task memory is the
//! smallest tier holding the summed container demand, the CPU is the smallest
//! power of two holding the summed CPU units, and the CPU is then raised to the
//! floor the memory tier requires. Values above the largest supported tier are
//! passed through; the platform rejects them at registration time.

use std::fmt;

use serde::Serialize;
use stevedore_common::constants::{CPU_FLOOR_BY_MEMORY, MIN_TASK_CPU_UNITS, MIN_TASK_MEMORY_MIB};
use stevedore_common::types::ContainerSet;

const MIB_PER_GB: u64 = 1024;

/// Resolved task-level CPU and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskSizing {
    /// CPU units (1024 = one vCPU).
    pub cpu_units: u64,
    /// Memory in MiB.
    pub memory_mib: u64,
}

impl TaskSizing {
    /// CPU value as registered with the platform.
    #[must_use]
    pub fn cpu(&self) -> String {
        self.cpu_units.to_string()
    }

    /// Memory value as registered with the platform ("0.5GB", "1GB", ...).
    #[must_use]
    pub fn memory(&self) -> String {
        if self.memory_mib < MIB_PER_GB {
            "0.5GB".to_string()
        } else {
            format!("{}GB", self.memory_mib / MIB_PER_GB)
        }
    }
}

impl fmt::Display for TaskSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu={} memory={}", self.cpu(), self.memory())
    }
}

/// Computes the default task sizing for a container set.
///
/// Pure and deterministic: the same set always yields the same sizing.
#[must_use]
pub fn compute_sizing(containers: &ContainerSet) -> TaskSizing {
    let (memory_demand, cpu_demand) = containers.iter().fold((0_u64, 0_u64), |(mem, cpu), c| {
        (
            mem.saturating_add(u64::from(c.memory_demand())),
            cpu.saturating_add(u64::from(c.cpu.unwrap_or(0))),
        )
    });

    let memory_mib = memory_tier(memory_demand);
    let cpu_units = cpu_tier(cpu_demand).max(cpu_floor(memory_mib));

    tracing::debug!(memory_demand, cpu_demand, memory_mib, cpu_units, "computed task sizing");
    TaskSizing {
        cpu_units,
        memory_mib,
    }
}

fn memory_tier(demand: u64) -> u64 {
    let min = u64::from(MIN_TASK_MEMORY_MIB);
    if demand <= min {
        return min;
    }
    demand.div_ceil(MIB_PER_GB).saturating_mul(MIB_PER_GB)
}

fn cpu_tier(demand: u64) -> u64 {
    demand
        .max(u64::from(MIN_TASK_CPU_UNITS))
        .checked_next_power_of_two()
        .unwrap_or(1 << 63)
}

fn cpu_floor(memory_mib: u64) -> u64 {
    CPU_FLOOR_BY_MEMORY
        .iter()
        .find(|(memory_above, _)| memory_mib > u64::from(*memory_above))
        .map_or(0, |(_, cpu)| u64::from(*cpu))
}
