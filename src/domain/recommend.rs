//! Recommendation selector — maps findings to deduplicated advisory text.
//!
//! Rule-derived recommendations come from a static template table keyed by
//! metric. External advisor text is additive only: the rule-derived entries
//! for MEDIUM+ findings survive regardless of advisor availability.

use super::rules::Finding;

const BASELINE_ADVISORIES: &[&str] = &[
    "Schedule periodic audits using cron for continuous monitoring",
    "Maintain baseline snapshots after system updates or configuration changes",
    "Continue monitoring authentication logs for unusual patterns",
    "Review system health metrics regularly to detect trends",
];

fn template_for(finding: &Finding) -> Option<&'static str> {
    if finding.metric_name.starts_with("service_errors/") {
        return Some(
            "Investigate service errors - check service status and logs for misconfiguration",
        );
    }
    match finding.metric_name.as_str() {
        "cpu_usage" => Some(
            "Investigate high CPU usage - check running processes and consider resource optimization",
        ),
        "memory_usage" => Some(
            "Review memory usage - identify memory-intensive processes and consider adding swap or RAM",
        ),
        "disk_usage" => Some(
            "Disk space is running low - clean up old logs, temporary files, or unused packages",
        ),
        "ssh_root_login" => Some(
            "Disable root SSH login for better security - edit /etc/ssh/sshd_config",
        ),
        "ssh_password_auth" => Some(
            "Consider disabling password authentication and using SSH keys only",
        ),
        "auth_failures" => Some(
            "Review authentication logs and consider implementing Fail2Ban to prevent brute force attacks",
        ),
        "kernel_errors" => Some(
            "Kernel errors detected - investigate hardware, drivers, or system stability issues",
        ),
        "segfaults" => Some(
            "Application crashes detected - review application logs and check for memory issues",
        ),
        _ => None,
    }
}

/// Build the ordered, deduplicated recommendation list for a finding set.
/// The baseline advisories are always appended, so the result is non-empty
/// even for an all-LOW run.
pub fn recommend(findings: &[Finding]) -> Vec<String> {
    let mut recommendations = Vec::new();

    for finding in findings {
        if let Some(text) = template_for(finding) {
            push_unique(&mut recommendations, text.to_string());
        }
    }

    for advisory in BASELINE_ADVISORIES {
        push_unique(&mut recommendations, (*advisory).to_string());
    }

    recommendations
}

/// Append externally supplied advisory lines without disturbing the
/// rule-derived entries. Duplicates and blank lines are dropped.
pub fn merge_external(mut recommendations: Vec<String>, external: Vec<String>) -> Vec<String> {
    for line in external {
        let line = line.trim();
        if !line.is_empty() {
            push_unique(&mut recommendations, line.to_string());
        }
    }
    recommendations
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::{evaluate, Category};
    use crate::domain::snapshot::sample_snapshot;

    #[test]
    fn healthy_run_still_gets_baseline_advisories() {
        let findings = evaluate(&sample_snapshot());
        let recommendations = recommend(&findings);
        assert_eq!(recommendations, BASELINE_ADVISORIES);
    }

    #[test]
    fn duplicate_templates_collapse() {
        let mut snapshot = sample_snapshot();
        let names = ["nginx".to_string(), "mysql".to_string()].into();
        snapshot.logs.service_error_names = Some(names);

        let findings = evaluate(&snapshot);
        let recommendations = recommend(&findings);
        let service_lines = recommendations
            .iter()
            .filter(|r| r.contains("service errors"))
            .count();
        assert_eq!(service_lines, 1);
    }

    #[test]
    fn rule_recommendations_precede_baseline_advisories() {
        let mut snapshot = sample_snapshot();
        snapshot.cpu.usage_percent = Some(95.0);

        let recommendations = recommend(&evaluate(&snapshot));
        assert!(recommendations[0].contains("CPU"));
        assert!(recommendations.len() > BASELINE_ADVISORIES.len());
    }

    #[test]
    fn external_merge_is_additive_and_deduplicated() {
        let mut snapshot = sample_snapshot();
        snapshot.ssh.root_login_enabled = Some(true);
        let findings = evaluate(&snapshot);

        let merged = merge_external(
            recommend(&findings),
            vec![
                "Rotate SSH host keys".to_string(),
                "  ".to_string(),
                "Rotate SSH host keys".to_string(),
            ],
        );

        // The rule-derived HIGH finding's advice survives the merge.
        assert!(merged.iter().any(|l| l.contains("Disable root SSH login")));
        assert_eq!(merged.iter().filter(|l| *l == "Rotate SSH host keys").count(), 1);
        assert!(findings.iter().any(|f| f.category == Category::Security));
    }
}
