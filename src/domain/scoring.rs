//! Risk scorer — aggregates findings into a single 0..100 score.

use serde::{Deserialize, Serialize};

use super::rules::{Finding, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskBucket::Low => "LOW",
            RiskBucket::Medium => "MEDIUM",
            RiskBucket::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// Weighted severity sum, clamped to 100. Recomputed every run, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    pub value: u8,
    pub bucket: RiskBucket,
}

const fn weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 15,
        Severity::Medium => 7,
        Severity::Low => 1,
    }
}

fn bucket_for(value: u8) -> RiskBucket {
    match value {
        0..=20 => RiskBucket::Low,
        21..=50 => RiskBucket::Medium,
        _ => RiskBucket::High,
    }
}

/// Compute the aggregate risk score for a finding set.
pub fn score(findings: &[Finding]) -> RiskScore {
    let total: u32 = findings.iter().map(|f| weight(f.severity)).sum();
    let value = total.min(100) as u8;
    RiskScore {
        value,
        bucket: bucket_for(value),
    }
}

/// The highest individual finding severity. Reported alongside the numeric
/// score; the two intentionally need not agree (many MEDIUM findings can
/// push the score into the HIGH bucket without any single HIGH finding).
pub fn overall_severity(findings: &[Finding]) -> Severity {
    findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(Severity::Low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::Category;

    fn finding(severity: Severity) -> Finding {
        Finding {
            category: Category::Health,
            metric_name: "cpu_usage".into(),
            severity,
            message: String::new(),
            observed_value: String::new(),
        }
    }

    #[test]
    fn bucket_boundaries_match_table() {
        assert_eq!(bucket_for(0), RiskBucket::Low);
        assert_eq!(bucket_for(20), RiskBucket::Low);
        assert_eq!(bucket_for(21), RiskBucket::Medium);
        assert_eq!(bucket_for(50), RiskBucket::Medium);
        assert_eq!(bucket_for(51), RiskBucket::High);
        assert_eq!(bucket_for(100), RiskBucket::High);
    }

    #[test]
    fn weighted_sum_clamps_to_100() {
        let findings: Vec<_> = (0..6).map(|_| finding(Severity::Critical)).collect();
        let risk = score(&findings);
        assert_eq!(risk.value, 100);
        assert_eq!(risk.bucket, RiskBucket::High);
    }

    #[test]
    fn one_critical_and_two_low_scores_27() {
        let findings = vec![
            finding(Severity::Critical),
            finding(Severity::Low),
            finding(Severity::Low),
        ];
        let risk = score(&findings);
        assert_eq!(risk.value, 27);
        assert_eq!(risk.bucket, RiskBucket::Medium);
    }

    #[test]
    fn many_mediums_reach_high_bucket_without_high_severity() {
        let findings: Vec<_> = (0..8).map(|_| finding(Severity::Medium)).collect();
        let risk = score(&findings);
        assert_eq!(risk.value, 56);
        assert_eq!(risk.bucket, RiskBucket::High);
        assert_eq!(overall_severity(&findings), Severity::Medium);
    }

    #[test]
    fn overall_severity_is_max_and_defaults_low() {
        assert_eq!(overall_severity(&[]), Severity::Low);
        let findings = vec![finding(Severity::Medium), finding(Severity::High)];
        assert_eq!(overall_severity(&findings), Severity::High);
    }

    #[test]
    fn critical_cpu_on_otherwise_healthy_host_lands_in_medium_bucket() {
        let mut snapshot = crate::domain::snapshot::sample_snapshot();
        snapshot.cpu.usage_percent = Some(95.0);

        let findings = crate::domain::rules::evaluate(&snapshot);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].metric_name, "cpu_usage");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[1].metric_name, "security_status");
        assert_eq!(findings[2].metric_name, "log_status");

        let risk = score(&findings);
        assert_eq!(risk.value, 27);
        assert_eq!(risk.bucket, RiskBucket::Medium);
        assert_eq!(overall_severity(&findings), Severity::Critical);
    }

    #[test]
    fn empty_findings_score_zero() {
        let risk = score(&[]);
        assert_eq!(risk.value, 0);
        assert_eq!(risk.bucket, RiskBucket::Low);
    }
}
