//! `hostaudit security` — security-focused audit view.
//!
//! Same rule engine as the full audit, filtered to SSH posture and
//! authentication anomalies.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::audit::{print_findings, print_recommendations};
use crate::domain::collector::SnapshotCollector;
use crate::domain::normalize::normalize;
use crate::domain::recommend;
use crate::domain::rules::{evaluate, Category, Finding};

#[derive(Debug, Serialize)]
struct SecurityReport {
    findings: Vec<Finding>,
    recommendations: Vec<String>,
}

pub fn run(format: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(format))
}

async fn run_async(format: &str) -> Result<()> {
    let raw = SnapshotCollector::collect().await;
    let snapshot = normalize(raw);

    let findings: Vec<Finding> = evaluate(&snapshot)
        .into_iter()
        .filter(is_security_relevant)
        .collect();
    let recommendations = recommend::recommend(&findings);

    let report = SecurityReport {
        findings,
        recommendations,
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "═══ Security Audit ═══".cyan().bold());
    println!();
    println!("{}", "── Security Findings ──".yellow());
    print_findings(&report.findings);
    println!();
    println!("{}", "── Recommendations ──".yellow());
    print_recommendations(&report.recommendations);

    Ok(())
}

fn is_security_relevant(finding: &Finding) -> bool {
    finding.category == Category::Security || finding.metric_name == "auth_failures"
}
