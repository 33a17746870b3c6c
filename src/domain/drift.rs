//! Baseline differ — field-level and finding-level drift between snapshots.

use serde::Serialize;
use serde_json::{json, Value};

use super::rules::{evaluate, Finding};
use super::scoring::{score, RiskScore};
use super::snapshot::{StoredBaseline, SystemSnapshot};

/// One leaf-field difference. Numeric leaves carry `change = new - old`;
/// categorical leaves and known/unknown transitions carry values only.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDelta {
    pub field: String,
    pub old: Value,
    pub new: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

/// Transient comparison result. Recomputed per invocation, never persisted.
#[derive(Debug, Serialize)]
pub struct DriftReport {
    pub compared_against: String,
    pub baseline_created_at: chrono::DateTime<chrono::Utc>,
    pub field_deltas: Vec<FieldDelta>,
    pub new_findings: Vec<Finding>,
    pub resolved_findings: Vec<Finding>,
    pub baseline_risk: RiskScore,
    pub current_risk: RiskScore,
}

/// Compare the current snapshot against a stored baseline.
///
/// Findings are re-derived from both snapshots; new/resolved sets are the
/// differences on `(category, metric_name)` identity. Risk scores for both
/// sides are exposed for the caller, not re-aggregated here.
pub fn diff(current: &SystemSnapshot, baseline: &StoredBaseline) -> DriftReport {
    let mut deltas = Vec::new();
    collect_field_deltas(current, &baseline.snapshot, &mut deltas);

    let current_findings = evaluate(current);
    let baseline_findings = evaluate(&baseline.snapshot);

    let new_findings: Vec<Finding> = current_findings
        .iter()
        .filter(|f| !baseline_findings.iter().any(|b| b.identity() == f.identity()))
        .cloned()
        .collect();
    let resolved_findings: Vec<Finding> = baseline_findings
        .iter()
        .filter(|b| !current_findings.iter().any(|f| f.identity() == b.identity()))
        .cloned()
        .collect();

    DriftReport {
        compared_against: baseline.name.clone(),
        baseline_created_at: baseline.created_at,
        field_deltas: deltas,
        new_findings,
        resolved_findings,
        baseline_risk: score(&baseline_findings),
        current_risk: score(&current_findings),
    }
}

fn collect_field_deltas(
    current: &SystemSnapshot,
    baseline: &SystemSnapshot,
    deltas: &mut Vec<FieldDelta>,
) {
    numeric_f64(deltas, "cpu.load_1min", baseline.cpu.load_1min, current.cpu.load_1min);
    numeric_u32(deltas, "cpu.cores", baseline.cpu.cores, current.cpu.cores);
    numeric_f64(
        deltas,
        "cpu.usage_percent",
        baseline.cpu.usage_percent,
        current.cpu.usage_percent,
    );

    numeric_u64(deltas, "memory.total_mb", baseline.memory.total_mb, current.memory.total_mb);
    numeric_u64(deltas, "memory.used_mb", baseline.memory.used_mb, current.memory.used_mb);
    numeric_u64(
        deltas,
        "memory.available_mb",
        baseline.memory.available_mb,
        current.memory.available_mb,
    );
    numeric_f64(
        deltas,
        "memory.usage_percent",
        baseline.memory.usage_percent,
        current.memory.usage_percent,
    );

    numeric_f64(
        deltas,
        "disk.usage_percent",
        baseline.disk.usage_percent,
        current.disk.usage_percent,
    );
    numeric_u64(deltas, "disk.total_mb", baseline.disk.total_mb, current.disk.total_mb);
    numeric_u64(deltas, "disk.used_mb", baseline.disk.used_mb, current.disk.used_mb);
    numeric_u64(
        deltas,
        "disk.available_mb",
        baseline.disk.available_mb,
        current.disk.available_mb,
    );

    numeric_u32(
        deltas,
        "users.logged_in_count",
        baseline.users.logged_in_count,
        current.users.logged_in_count,
    );
    categorical(
        deltas,
        "users.root_logged_in",
        json!(baseline.users.root_logged_in),
        json!(current.users.root_logged_in),
    );

    numeric_u32(
        deltas,
        "services.active_count",
        baseline.services.active_count,
        current.services.active_count,
    );
    categorical(
        deltas,
        "services.active_names",
        json!(baseline.services.active_names),
        json!(current.services.active_names),
    );

    categorical(
        deltas,
        "ssh.config_exists",
        json!(baseline.ssh.config_exists),
        json!(current.ssh.config_exists),
    );
    categorical(
        deltas,
        "ssh.root_login_enabled",
        json!(baseline.ssh.root_login_enabled),
        json!(current.ssh.root_login_enabled),
    );
    categorical(
        deltas,
        "ssh.password_auth_enabled",
        json!(baseline.ssh.password_auth_enabled),
        json!(current.ssh.password_auth_enabled),
    );
    categorical(
        deltas,
        "ssh.service_running",
        json!(baseline.ssh.service_running),
        json!(current.ssh.service_running),
    );

    numeric_u32(
        deltas,
        "logs.auth_failure_count",
        baseline.logs.auth_failure_count,
        current.logs.auth_failure_count,
    );
    categorical(
        deltas,
        "logs.service_error_names",
        json!(baseline.logs.service_error_names),
        json!(current.logs.service_error_names),
    );
    numeric_u32(
        deltas,
        "logs.kernel_error_count",
        baseline.logs.kernel_error_count,
        current.logs.kernel_error_count,
    );
    numeric_u32(
        deltas,
        "logs.segfault_count",
        baseline.logs.segfault_count,
        current.logs.segfault_count,
    );
}

fn numeric_f64(deltas: &mut Vec<FieldDelta>, field: &str, old: Option<f64>, new: Option<f64>) {
    push_numeric(deltas, field, old, new, |v| v);
}

fn numeric_u32(deltas: &mut Vec<FieldDelta>, field: &str, old: Option<u32>, new: Option<u32>) {
    push_numeric(deltas, field, old, new, f64::from);
}

fn numeric_u64(deltas: &mut Vec<FieldDelta>, field: &str, old: Option<u64>, new: Option<u64>) {
    push_numeric(deltas, field, old, new, |v| v as f64);
}

/// Numeric leaves with both sides known always get a delta entry; a
/// known/unknown transition is recorded without a computed change; leaves
/// unknown on both sides are skipped.
fn push_numeric<T>(
    deltas: &mut Vec<FieldDelta>,
    field: &str,
    old: Option<T>,
    new: Option<T>,
    as_f64: impl Fn(T) -> f64,
) where
    T: Copy + Serialize,
{
    match (old, new) {
        (Some(o), Some(n)) => deltas.push(FieldDelta {
            field: field.to_string(),
            old: json!(o),
            new: json!(n),
            change: Some(as_f64(n) - as_f64(o)),
        }),
        (Some(_), None) | (None, Some(_)) => deltas.push(FieldDelta {
            field: field.to_string(),
            old: json!(old),
            new: json!(new),
            change: None,
        }),
        (None, None) => {}
    }
}

fn categorical(deltas: &mut Vec<FieldDelta>, field: &str, old: Value, new: Value) {
    if old != new {
        deltas.push(FieldDelta {
            field: field.to_string(),
            old,
            new,
            change: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::{Category, Severity};
    use crate::domain::snapshot::sample_snapshot;

    fn baseline_of(snapshot: SystemSnapshot) -> StoredBaseline {
        StoredBaseline::new("b1".into(), snapshot)
    }

    #[test]
    fn identical_snapshots_have_no_categorical_deltas_and_zero_changes() {
        let snapshot = sample_snapshot();
        let report = diff(&snapshot, &baseline_of(snapshot.clone()));

        assert!(report.field_deltas.iter().all(|d| d.change == Some(0.0)));
        assert!(report.new_findings.is_empty());
        assert!(report.resolved_findings.is_empty());
        assert_eq!(report.baseline_risk, report.current_risk);
    }

    #[test]
    fn disk_spike_yields_delta_and_new_critical_finding() {
        let baseline_snapshot = sample_snapshot();
        let mut current = baseline_snapshot.clone();
        current.disk.usage_percent = Some(96.0);

        let report = diff(&current, &baseline_of(baseline_snapshot));

        let disk = report
            .field_deltas
            .iter()
            .find(|d| d.field == "disk.usage_percent")
            .unwrap();
        assert_eq!(disk.change, Some(46.0));

        assert_eq!(report.new_findings.len(), 1);
        let new = &report.new_findings[0];
        assert_eq!(new.metric_name, "disk_usage");
        assert_eq!(new.severity, Severity::Critical);

        // The healthy-status finding for Health resolved when disk fired.
        assert!(report
            .resolved_findings
            .iter()
            .any(|f| f.metric_name == "health_status"));
    }

    #[test]
    fn categorical_changes_recorded_only_when_different() {
        let baseline_snapshot = sample_snapshot();
        let mut current = baseline_snapshot.clone();
        current.ssh.root_login_enabled = Some(true);

        let report = diff(&current, &baseline_of(baseline_snapshot));

        assert!(report
            .field_deltas
            .iter()
            .any(|d| d.field == "ssh.root_login_enabled" && d.change.is_none()));
        assert!(!report
            .field_deltas
            .iter()
            .any(|d| d.field == "ssh.password_auth_enabled"));
    }

    #[test]
    fn service_set_change_appears_as_old_new_pair() {
        let baseline_snapshot = sample_snapshot();
        let mut current = baseline_snapshot.clone();
        if let Some(names) = current.services.active_names.as_mut() {
            names.insert("nginx".to_string());
        }

        let report = diff(&current, &baseline_of(baseline_snapshot));
        let services = report
            .field_deltas
            .iter()
            .find(|d| d.field == "services.active_names")
            .unwrap();
        assert!(services.new.to_string().contains("nginx"));
        assert!(!services.old.to_string().contains("nginx"));
    }

    #[test]
    fn known_to_unknown_transition_is_recorded_without_change() {
        let baseline_snapshot = sample_snapshot();
        let mut current = baseline_snapshot.clone();
        current.memory.usage_percent = None;

        let report = diff(&current, &baseline_of(baseline_snapshot));
        let memory = report
            .field_deltas
            .iter()
            .find(|d| d.field == "memory.usage_percent")
            .unwrap();
        assert!(memory.change.is_none());
        assert!(memory.new.is_null());
    }

    #[test]
    fn risk_scores_are_computed_independently_per_side() {
        let mut baseline_snapshot = sample_snapshot();
        baseline_snapshot.cpu.usage_percent = Some(95.0);
        let current = sample_snapshot();

        let report = diff(&current, &baseline_of(baseline_snapshot));
        assert!(report.baseline_risk.value > report.current_risk.value);
        assert!(report
            .resolved_findings
            .iter()
            .any(|f| f.category == Category::Health && f.metric_name == "cpu_usage"));
    }
}
