//! `hostaudit logs` — log intelligence view.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::audit::{fmt_count, print_findings, print_recommendations};
use crate::domain::collector::SnapshotCollector;
use crate::domain::normalize::normalize;
use crate::domain::recommend;
use crate::domain::rules::{evaluate, Category, Finding};
use crate::domain::snapshot::LogSummary;

#[derive(Debug, Serialize)]
struct LogReport {
    summary: LogSummary,
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
        .filter(|f| f.category == Category::Logs)
        .collect();
    let recommendations = recommend::recommend(&findings);

    let report = LogReport {
        summary: snapshot.logs.clone(),
        findings,
        recommendations,
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "═══ Log Intelligence Analysis ═══".cyan().bold());
    println!();
    println!("{}", "── Log Summary ──".yellow());
    println!(
        "  Failed SSH Logins: {}",
        fmt_count(report.summary.auth_failure_count)
    );
    println!(
        "  Service Errors:    {}",
        match &report.summary.service_error_names {
            Some(names) => names.len().to_string(),
            None => "unknown".dimmed().to_string(),
        }
    );
    println!(
        "  Kernel Errors:     {}",
        fmt_count(report.summary.kernel_error_count)
    );
    println!(
        "  Segfaults:         {}",
        fmt_count(report.summary.segfault_count)
    );
    println!();
    println!("{}", "── Log Findings ──".yellow());
    print_findings(&report.findings);
    println!();
    println!("{}", "── Recommendations ──".yellow());
    print_recommendations(&report.recommendations);

    Ok(())
}
