//! Metric normalizer — coerces raw collector output into a `SystemSnapshot`.
//!
//! Validation degrades field by field: an unparsable or out-of-domain leaf
//! becomes unknown (`None`) instead of failing the snapshot. Normalization
//! itself never fails.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::warn;

use super::snapshot::{
    CpuMetrics, DiskMetrics, LogSummary, MemoryMetrics, ServiceState, SshPosture, SystemSnapshot,
    UserActivity,
};

/// Untyped collector output. Leaves carry whatever the probes produced,
/// including values outside their valid domain.
#[derive(Debug, Clone, Default)]
pub struct RawMetrics {
    pub hostname: Option<String>,
    pub cpu: RawCpu,
    pub memory: RawMemory,
    pub disk: RawDisk,
    pub users: RawUsers,
    pub services: RawServices,
    pub ssh: RawSsh,
    pub logs: RawLogs,
}

#[derive(Debug, Clone, Default)]
pub struct RawCpu {
    pub load_1min: Option<f64>,
    pub cores: Option<i64>,
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RawMemory {
    pub total_mb: Option<i64>,
    pub used_mb: Option<i64>,
    pub available_mb: Option<i64>,
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RawDisk {
    pub usage_percent: Option<f64>,
    pub total_mb: Option<i64>,
    pub used_mb: Option<i64>,
    pub available_mb: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct RawUsers {
    pub logged_in_count: Option<i64>,
    pub root_logged_in: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RawServices {
    pub active_count: Option<i64>,
    pub active_names: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct RawSsh {
    pub config_exists: Option<bool>,
    pub root_login_enabled: Option<bool>,
    pub password_auth_enabled: Option<bool>,
    pub service_running: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RawLogs {
    pub auth_failure_count: Option<i64>,
    pub service_error_names: Option<BTreeSet<String>>,
    pub kernel_error_count: Option<i64>,
    pub segfault_count: Option<i64>,
}

/// Build the canonical snapshot from raw collector output.
pub fn normalize(raw: RawMetrics) -> SystemSnapshot {
    SystemSnapshot {
        timestamp: Utc::now(),
        hostname: raw.hostname.unwrap_or_else(|| "unknown".into()),
        cpu: CpuMetrics {
            load_1min: non_negative(raw.cpu.load_1min, "cpu.load_1min"),
            cores: count(raw.cpu.cores, "cpu.cores"),
            usage_percent: percent(raw.cpu.usage_percent, "cpu.usage_percent"),
        },
        memory: MemoryMetrics {
            total_mb: size_mb(raw.memory.total_mb, "memory.total_mb"),
            used_mb: size_mb(raw.memory.used_mb, "memory.used_mb"),
            available_mb: size_mb(raw.memory.available_mb, "memory.available_mb"),
            usage_percent: percent(raw.memory.usage_percent, "memory.usage_percent"),
        },
        disk: DiskMetrics {
            usage_percent: percent(raw.disk.usage_percent, "disk.usage_percent"),
            total_mb: size_mb(raw.disk.total_mb, "disk.total_mb"),
            used_mb: size_mb(raw.disk.used_mb, "disk.used_mb"),
            available_mb: size_mb(raw.disk.available_mb, "disk.available_mb"),
        },
        users: UserActivity {
            logged_in_count: count(raw.users.logged_in_count, "users.logged_in_count"),
            root_logged_in: raw.users.root_logged_in,
        },
        services: ServiceState {
            active_count: count(raw.services.active_count, "services.active_count"),
            active_names: raw.services.active_names,
        },
        ssh: SshPosture {
            config_exists: raw.ssh.config_exists,
            root_login_enabled: raw.ssh.root_login_enabled,
            password_auth_enabled: raw.ssh.password_auth_enabled,
            service_running: raw.ssh.service_running,
        },
        logs: LogSummary {
            auth_failure_count: count(raw.logs.auth_failure_count, "logs.auth_failure_count"),
            service_error_names: raw.logs.service_error_names,
            kernel_error_count: count(raw.logs.kernel_error_count, "logs.kernel_error_count"),
            segfault_count: count(raw.logs.segfault_count, "logs.segfault_count"),
        },
    }
}

/// Percentages live in [0,100]; out-of-range values clamp, NaN is unknown.
fn percent(value: Option<f64>, field: &str) -> Option<f64> {
    let v = value?;
    if v.is_nan() {
        warn!(field, "discarding NaN percentage");
        return None;
    }
    if !(0.0..=100.0).contains(&v) {
        warn!(field, value = v, "clamping out-of-range percentage");
    }
    Some(v.clamp(0.0, 100.0))
}

fn count(value: Option<i64>, field: &str) -> Option<u32> {
    let v = value?;
    if v < 0 {
        warn!(field, value = v, "discarding negative count");
        return None;
    }
    u32::try_from(v).ok()
}

fn size_mb(value: Option<i64>, field: &str) -> Option<u64> {
    let v = value?;
    if v < 0 {
        warn!(field, value = v, "discarding negative size");
        return None;
    }
    Some(v as u64)
}

fn non_negative(value: Option<f64>, field: &str) -> Option<f64> {
    let v = value?;
    if v.is_nan() || v < 0.0 {
        warn!(field, value = v, "discarding invalid reading");
        return None;
    }
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_percent_clamps() {
        let raw = RawMetrics {
            cpu: RawCpu {
                usage_percent: Some(104.2),
                ..Default::default()
            },
            disk: RawDisk {
                usage_percent: Some(-3.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let snapshot = normalize(raw);
        assert_eq!(snapshot.cpu.usage_percent, Some(100.0));
        assert_eq!(snapshot.disk.usage_percent, Some(0.0));
    }

    #[test]
    fn nan_percent_becomes_unknown() {
        let raw = RawMetrics {
            memory: RawMemory {
                usage_percent: Some(f64::NAN),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(normalize(raw).memory.usage_percent, None);
    }

    #[test]
    fn negative_count_becomes_unknown() {
        let raw = RawMetrics {
            logs: RawLogs {
                auth_failure_count: Some(-7),
                kernel_error_count: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let snapshot = normalize(raw);
        assert_eq!(snapshot.logs.auth_failure_count, None);
        assert_eq!(snapshot.logs.kernel_error_count, Some(2));
    }

    #[test]
    fn empty_input_yields_fully_unknown_snapshot() {
        let snapshot = normalize(RawMetrics::default());
        assert_eq!(snapshot.hostname, "unknown");
        assert_eq!(snapshot.cpu.usage_percent, None);
        assert_eq!(snapshot.memory.total_mb, None);
        assert_eq!(snapshot.ssh.root_login_enabled, None);
        assert_eq!(snapshot.logs.service_error_names, None);
    }
}
