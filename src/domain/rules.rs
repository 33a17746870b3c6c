//! Rule engine — fixed threshold and pattern rules over a snapshot.
//!
//! Evaluation is deterministic: Health findings first, then Security, then
//! Logs, in rule declaration order within a category. Unknown leaves never
//! fire a rule. A category with no fired rule still emits one LOW status
//! finding, so the findings list is never empty.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::SystemSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Health,
    Security,
    Logs,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Health => "Health",
            Category::Security => "Security",
            Category::Logs => "Logs",
        };
        f.write_str(s)
    }
}

/// One rule-evaluation result. Pure derived data, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub category: Category,
    pub metric_name: String,
    pub severity: Severity,
    pub message: String,
    pub observed_value: String,
}

impl Finding {
    /// Identity used for baseline drift comparison.
    pub fn identity(&self) -> (Category, &str) {
        (self.category, self.metric_name.as_str())
    }
}

/// One severity band: fires when the observed value is strictly above
/// `above`. Bands are declared highest first; the first match wins.
struct Band {
    above: f64,
    severity: Severity,
}

/// An ordered threshold rule for one percentage metric.
struct ThresholdRule {
    metric: &'static str,
    label: &'static str,
    bands: &'static [Band],
}

const HEALTH_RULES: &[ThresholdRule] = &[
    ThresholdRule {
        metric: "cpu_usage",
        label: "CPU",
        bands: &[
            Band { above: 90.0, severity: Severity::Critical },
            Band { above: 80.0, severity: Severity::High },
            Band { above: 60.0, severity: Severity::Medium },
        ],
    },
    ThresholdRule {
        metric: "memory_usage",
        label: "Memory",
        bands: &[
            Band { above: 90.0, severity: Severity::Critical },
            Band { above: 80.0, severity: Severity::High },
            Band { above: 75.0, severity: Severity::Medium },
        ],
    },
    ThresholdRule {
        metric: "disk_usage",
        label: "Disk",
        bands: &[
            Band { above: 90.0, severity: Severity::Critical },
            Band { above: 85.0, severity: Severity::High },
            Band { above: 75.0, severity: Severity::Medium },
        ],
    },
];

const AUTH_FAILURE_BANDS: &[Band] = &[
    Band { above: 20.0, severity: Severity::High },
    Band { above: 5.0, severity: Severity::Medium },
];

/// One finding per distinct failing service, bounded so a noisy host cannot
/// flood the report.
const SERVICE_ERROR_FINDING_CAP: usize = 5;

fn band_match(bands: &[Band], value: f64) -> Option<Severity> {
    bands.iter().find(|b| value > b.above).map(|b| b.severity)
}

/// Evaluate all rules against a snapshot.
pub fn evaluate(snapshot: &SystemSnapshot) -> Vec<Finding> {
    let mut findings = Vec::new();

    evaluate_health(snapshot, &mut findings);
    evaluate_security(snapshot, &mut findings);
    evaluate_logs(snapshot, &mut findings);

    findings
}

fn evaluate_health(snapshot: &SystemSnapshot, findings: &mut Vec<Finding>) {
    let observed = [
        snapshot.cpu.usage_percent,
        snapshot.memory.usage_percent,
        snapshot.disk.usage_percent,
    ];

    let before = findings.len();
    for (rule, value) in HEALTH_RULES.iter().zip(observed) {
        let Some(pct) = value else { continue };
        if let Some(severity) = band_match(rule.bands, pct) {
            findings.push(Finding {
                category: Category::Health,
                metric_name: rule.metric.to_string(),
                severity,
                message: format!("{} usage is at {:.1}%", rule.label, pct),
                observed_value: format!("{:.1}%", pct),
            });
        }
    }

    if findings.len() == before {
        findings.push(status_finding(
            Category::Health,
            "health_status",
            "No abnormal resource usage detected",
        ));
    }
}

fn evaluate_security(snapshot: &SystemSnapshot, findings: &mut Vec<Finding>) {
    let before = findings.len();

    if snapshot.ssh.root_login_enabled == Some(true) {
        findings.push(Finding {
            category: Category::Security,
            metric_name: "ssh_root_login".into(),
            severity: Severity::High,
            message: "Root login via SSH is enabled".into(),
            observed_value: "enabled".into(),
        });
    }

    if snapshot.ssh.password_auth_enabled == Some(true) {
        findings.push(Finding {
            category: Category::Security,
            metric_name: "ssh_password_auth".into(),
            severity: Severity::Medium,
            message: "SSH password authentication is enabled".into(),
            observed_value: "enabled".into(),
        });
    }

    if findings.len() == before {
        findings.push(status_finding(
            Category::Security,
            "security_status",
            "No security misconfigurations found",
        ));
    }
}

fn evaluate_logs(snapshot: &SystemSnapshot, findings: &mut Vec<Finding>) {
    let before = findings.len();

    if let Some(failures) = snapshot.logs.auth_failure_count {
        if let Some(severity) = band_match(AUTH_FAILURE_BANDS, f64::from(failures)) {
            findings.push(Finding {
                category: Category::Logs,
                metric_name: "auth_failures".into(),
                severity,
                message: format!("{} failed SSH login attempts detected", failures),
                observed_value: failures.to_string(),
            });
        }
    }

    if let Some(names) = &snapshot.logs.service_error_names {
        for name in names.iter().take(SERVICE_ERROR_FINDING_CAP) {
            findings.push(Finding {
                category: Category::Logs,
                metric_name: format!("service_errors/{}", name),
                severity: Severity::Medium,
                message: format!("Service-related errors detected for {}", name),
                observed_value: name.clone(),
            });
        }
    }

    if let Some(kernel) = snapshot.logs.kernel_error_count {
        if kernel > 0 {
            findings.push(Finding {
                category: Category::Logs,
                metric_name: "kernel_errors".into(),
                severity: Severity::High,
                message: format!("{} kernel errors detected in system logs", kernel),
                observed_value: kernel.to_string(),
            });
        }
    }

    if let Some(segfaults) = snapshot.logs.segfault_count {
        if segfaults > 0 {
            findings.push(Finding {
                category: Category::Logs,
                metric_name: "segfaults".into(),
                severity: Severity::High,
                message: format!("{} segmentation faults detected", segfaults),
                observed_value: segfaults.to_string(),
            });
        }
    }

    if findings.len() == before {
        findings.push(status_finding(
            Category::Logs,
            "log_status",
            "Logs show normal operational behavior",
        ));
    }
}

fn status_finding(category: Category, metric_name: &str, message: &str) -> Finding {
    Finding {
        category,
        metric_name: metric_name.into(),
        severity: Severity::Low,
        message: message.into(),
        observed_value: "ok".into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::snapshot::sample_snapshot;

    #[test]
    fn healthy_snapshot_yields_one_status_finding_per_category() {
        let findings = evaluate(&sample_snapshot());
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.severity == Severity::Low));
        assert_eq!(findings[0].category, Category::Health);
        assert_eq!(findings[1].category, Category::Security);
        assert_eq!(findings[2].category, Category::Logs);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut snapshot = sample_snapshot();
        snapshot.cpu.usage_percent = Some(85.0);
        snapshot.ssh.password_auth_enabled = Some(true);
        snapshot.logs.auth_failure_count = Some(30);

        let first = evaluate(&snapshot);
        let second = evaluate(&snapshot);
        assert_eq!(first, second);
    }

    #[test]
    fn threshold_bands_use_strict_greater_than() {
        let mut snapshot = sample_snapshot();

        snapshot.cpu.usage_percent = Some(90.0);
        let findings = evaluate(&snapshot);
        let cpu = findings.iter().find(|f| f.metric_name == "cpu_usage").unwrap();
        assert_eq!(cpu.severity, Severity::High);

        snapshot.cpu.usage_percent = Some(90.0001);
        let findings = evaluate(&snapshot);
        let cpu = findings.iter().find(|f| f.metric_name == "cpu_usage").unwrap();
        assert_eq!(cpu.severity, Severity::Critical);

        snapshot.cpu.usage_percent = Some(60.0);
        let findings = evaluate(&snapshot);
        assert!(!findings.iter().any(|f| f.metric_name == "cpu_usage"));
    }

    #[test]
    fn memory_and_disk_bands_differ_from_cpu() {
        let mut snapshot = sample_snapshot();
        snapshot.memory.usage_percent = Some(76.0);
        snapshot.disk.usage_percent = Some(86.0);

        let findings = evaluate(&snapshot);
        let memory = findings.iter().find(|f| f.metric_name == "memory_usage").unwrap();
        assert_eq!(memory.severity, Severity::Medium);
        let disk = findings.iter().find(|f| f.metric_name == "disk_usage").unwrap();
        assert_eq!(disk.severity, Severity::High);
    }

    #[test]
    fn auth_failure_bands() {
        let mut snapshot = sample_snapshot();

        snapshot.logs.auth_failure_count = Some(5);
        assert!(!evaluate(&snapshot).iter().any(|f| f.metric_name == "auth_failures"));

        snapshot.logs.auth_failure_count = Some(6);
        let findings = evaluate(&snapshot);
        let auth = findings.iter().find(|f| f.metric_name == "auth_failures").unwrap();
        assert_eq!(auth.severity, Severity::Medium);

        snapshot.logs.auth_failure_count = Some(21);
        let findings = evaluate(&snapshot);
        let auth = findings.iter().find(|f| f.metric_name == "auth_failures").unwrap();
        assert_eq!(auth.severity, Severity::High);
    }

    #[test]
    fn ssh_misconfiguration_rules() {
        let mut snapshot = sample_snapshot();
        snapshot.ssh.root_login_enabled = Some(true);
        snapshot.ssh.password_auth_enabled = Some(true);

        let findings = evaluate(&snapshot);
        let root = findings.iter().find(|f| f.metric_name == "ssh_root_login").unwrap();
        assert_eq!(root.severity, Severity::High);
        let pass = findings.iter().find(|f| f.metric_name == "ssh_password_auth").unwrap();
        assert_eq!(pass.severity, Severity::Medium);
        assert!(!findings.iter().any(|f| f.metric_name == "security_status"));
    }

    #[test]
    fn service_error_findings_are_per_service_and_capped() {
        let mut snapshot = sample_snapshot();
        let names: BTreeSet<String> = (0..8).map(|i| format!("svc{}", i)).collect();
        snapshot.logs.service_error_names = Some(names);

        let findings = evaluate(&snapshot);
        let service_findings: Vec<_> = findings
            .iter()
            .filter(|f| f.metric_name.starts_with("service_errors/"))
            .collect();
        assert_eq!(service_findings.len(), SERVICE_ERROR_FINDING_CAP);
        assert!(service_findings.iter().all(|f| f.severity == Severity::Medium));
    }

    #[test]
    fn unknown_leaves_never_fire_rules() {
        let snapshot = crate::domain::normalize::normalize(Default::default());
        let findings = evaluate(&snapshot);

        // Fully unknown input: only the three status findings.
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.severity == Severity::Low));
    }

    #[test]
    fn kernel_and_segfault_rules_fire_above_zero() {
        let mut snapshot = sample_snapshot();
        snapshot.logs.kernel_error_count = Some(1);
        snapshot.logs.segfault_count = Some(2);

        let findings = evaluate(&snapshot);
        assert!(findings
            .iter()
            .any(|f| f.metric_name == "kernel_errors" && f.severity == Severity::High));
        assert!(findings
            .iter()
            .any(|f| f.metric_name == "segfaults" && f.severity == Severity::High));
    }
}
