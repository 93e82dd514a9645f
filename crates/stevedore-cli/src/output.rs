//! Formatted output helpers for CLI commands.

/// Formats a MiB count into a human-readable string (e.g., "512 MiB", "3.0 GiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_mib(mib: u64) -> String {
    const MIB_PER_GIB: u64 = 1024;

    if mib >= MIB_PER_GIB {
        format!("{:.1} GiB", mib as f64 / MIB_PER_GIB as f64)
    } else {
        format!("{mib} MiB")
    }
}

/// Formats CPU units as vCPUs (1024 units = 1 vCPU).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_vcpu(units: u64) -> String {
    format!("{} vCPU", units as f64 / 1024.0)
}
