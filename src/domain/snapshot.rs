//! System snapshot — the canonical point-in-time record of host state.
//!
//! Collectors produce an untyped `RawMetrics`; normalization turns it into
//! this typed, validated form. A `None` leaf means the probe could not
//! produce a usable value, which is distinct from a real zero.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A snapshot wrapped with integrity metadata for baseline storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBaseline {
    /// Unique baseline name, also the file stem on disk.
    pub name: String,
    /// SHA-256 checksum of the serialized snapshot: "sha256:<hex>"
    pub checksum: String,
    /// When the baseline was saved.
    pub created_at: DateTime<Utc>,
    /// Version of the collector that produced the snapshot.
    pub collector_version: String,
    /// The snapshot itself.
    pub snapshot: SystemSnapshot,
}

impl StoredBaseline {
    /// Wrap a snapshot under a name, computing the SHA-256 checksum.
    pub fn new(name: String, snapshot: SystemSnapshot) -> Self {
        Self {
            name,
            checksum: snapshot_checksum(&snapshot),
            created_at: Utc::now(),
            collector_version: env!("CARGO_PKG_VERSION").to_string(),
            snapshot,
        }
    }

    /// Verify the checksum matches the snapshot data. Returns true if valid.
    pub fn verify(&self) -> bool {
        self.checksum == snapshot_checksum(&self.snapshot)
    }
}

fn snapshot_checksum(snapshot: &SystemSnapshot) -> String {
    let serialized = serde_json::to_string(snapshot).unwrap_or_default();
    let hash = Sha256::digest(serialized.as_bytes());
    format!("sha256:{:x}", hash)
}

/// Complete audited state of one host at one instant. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub users: UserActivity,
    pub services: ServiceState,
    pub ssh: SshPosture,
    pub logs: LogSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    #[serde(default)]
    pub load_1min: Option<f64>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    #[serde(default)]
    pub total_mb: Option<u64>,
    #[serde(default)]
    pub used_mb: Option<u64>,
    #[serde(default)]
    pub available_mb: Option<u64>,
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

/// Root filesystem usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    #[serde(default)]
    pub usage_percent: Option<f64>,
    #[serde(default)]
    pub total_mb: Option<u64>,
    #[serde(default)]
    pub used_mb: Option<u64>,
    #[serde(default)]
    pub available_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    #[serde(default)]
    pub logged_in_count: Option<u32>,
    #[serde(default)]
    pub root_logged_in: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    #[serde(default)]
    pub active_count: Option<u32>,
    #[serde(default)]
    pub active_names: Option<BTreeSet<String>>,
}

/// SSH daemon configuration as read from sshd_config and the process table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SshPosture {
    #[serde(default)]
    pub config_exists: Option<bool>,
    #[serde(default)]
    pub root_login_enabled: Option<bool>,
    #[serde(default)]
    pub password_auth_enabled: Option<bool>,
    #[serde(default)]
    pub service_running: Option<bool>,
}

/// Derived counts from the authentication and system log excerpts.
/// Raw log text never appears in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    #[serde(default)]
    pub auth_failure_count: Option<u32>,
    #[serde(default)]
    pub service_error_names: Option<BTreeSet<String>>,
    #[serde(default)]
    pub kernel_error_count: Option<u32>,
    #[serde(default)]
    pub segfault_count: Option<u32>,
}

/// Fully-known healthy snapshot used as a starting point across test modules.
#[cfg(test)]
pub(crate) fn sample_snapshot() -> SystemSnapshot {
    SystemSnapshot {
        timestamp: "2025-11-02T10:00:00Z".parse().unwrap(),
        hostname: "node-a".into(),
        cpu: CpuMetrics {
            load_1min: Some(0.42),
            cores: Some(8),
            usage_percent: Some(12.5),
        },
        memory: MemoryMetrics {
            total_mb: Some(16_000),
            used_mb: Some(4_000),
            available_mb: Some(12_000),
            usage_percent: Some(25.0),
        },
        disk: DiskMetrics {
            usage_percent: Some(50.0),
            total_mb: Some(500_000),
            used_mb: Some(250_000),
            available_mb: Some(250_000),
        },
        users: UserActivity {
            logged_in_count: Some(1),
            root_logged_in: Some(false),
        },
        services: ServiceState {
            active_count: Some(2),
            active_names: Some(["sshd".to_string(), "cron".to_string()].into()),
        },
        ssh: SshPosture {
            config_exists: Some(true),
            root_login_enabled: Some(false),
            password_auth_enabled: Some(false),
            service_running: Some(true),
        },
        logs: LogSummary {
            auth_failure_count: Some(0),
            service_error_names: Some(BTreeSet::new()),
            kernel_error_count: Some(0),
            segfault_count: Some(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_baseline_checksum_round_trip() {
        let stored = StoredBaseline::new("b1".into(), sample_snapshot());
        assert!(stored.verify());

        let json = serde_json::to_string(&stored).unwrap();
        let parsed: StoredBaseline = serde_json::from_str(&json).unwrap();
        assert!(parsed.verify());
        assert_eq!(parsed.snapshot, stored.snapshot);
    }

    #[test]
    fn verify_rejects_tampered_snapshot() {
        let mut stored = StoredBaseline::new("b1".into(), sample_snapshot());
        stored.snapshot.disk.usage_percent = Some(99.0);
        assert!(!stored.verify());
    }

    #[test]
    fn unknown_leaves_survive_serialization() {
        let mut snapshot = sample_snapshot();
        snapshot.cpu.usage_percent = None;
        snapshot.logs.service_error_names = None;

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: SystemSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.cpu.usage_percent, None);
    }
}
