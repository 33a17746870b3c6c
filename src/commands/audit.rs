//! `hostaudit audit` — full system audit: collect, evaluate, score, advise.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tracing::warn;

use crate::advisor::{self, Advisor};
use crate::config::Config;
use crate::domain::collector::SnapshotCollector;
use crate::domain::normalize::normalize;
use crate::domain::process::{self, ProcessSnapshot};
use crate::domain::recommend;
use crate::domain::rules::{evaluate, Finding, Severity};
use crate::domain::scoring::{overall_severity, score, RiskBucket, RiskScore};
use crate::domain::snapshot::SystemSnapshot;

/// Everything the formatting layer needs for one audit run.
#[derive(Debug, Serialize)]
pub struct AuditReport {
    pub snapshot: SystemSnapshot,
    pub findings: Vec<Finding>,
    pub risk_score: RiskScore,
    pub overall_severity: Severity,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processes: Option<ProcessSnapshot>,
}

pub fn run(format: &str, full: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(format, full))
}

async fn run_async(format: &str, full: bool) -> Result<()> {
    let cfg = crate::config::load()?;
    let report = build_report(&cfg, full).await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_table(&report),
    }
    Ok(())
}

/// Run the full audit pipeline. Collector and advisor failures degrade;
/// this always produces a complete report.
pub(crate) async fn build_report(cfg: &Config, full: bool) -> AuditReport {
    let raw = SnapshotCollector::collect().await;
    let snapshot = normalize(raw);
    let findings = evaluate(&snapshot);
    let risk_score = score(&findings);
    let severity = overall_severity(&findings);

    let mut recommendations = recommend::recommend(&findings);
    match Advisor::from_config(&cfg.advisor) {
        Ok(Advisor::Disabled) => {}
        Ok(advisor) => match advisor.advise(&advisor::digest(&findings)).await {
            Ok(extra) => {
                recommendations = recommend::merge_external(recommendations, extra);
            }
            Err(e) => {
                warn!(error = %e, "advisor unavailable, keeping static recommendations");
            }
        },
        Err(e) => {
            warn!(error = %e, "could not build advisor client");
        }
    }

    let processes = if full { process::collect().await } else { None };

    AuditReport {
        snapshot,
        findings,
        risk_score,
        overall_severity: severity,
        recommendations,
        processes,
    }
}

pub(crate) fn severity_label(severity: Severity) -> String {
    let tag = format!("[{}]", severity);
    match severity {
        Severity::Critical => tag.red().bold().to_string(),
        Severity::High => tag.red().to_string(),
        Severity::Medium => tag.yellow().to_string(),
        Severity::Low => tag.green().to_string(),
    }
}

fn risk_label(risk: RiskScore) -> String {
    let text = format!("{} / 100 ({})", risk.value, risk.bucket);
    match risk.bucket {
        RiskBucket::High => text.red().bold().to_string(),
        RiskBucket::Medium => text.yellow().to_string(),
        RiskBucket::Low => text.green().to_string(),
    }
}

fn fmt_percent(value: Option<f64>) -> String {
    match value {
        Some(pct) if pct > 90.0 => format!("{:.1}%", pct).red().to_string(),
        Some(pct) if pct > 75.0 => format!("{:.1}%", pct).yellow().to_string(),
        Some(pct) => format!("{:.1}%", pct),
        None => "unknown".dimmed().to_string(),
    }
}

pub(crate) fn fmt_count(value: Option<u32>) -> String {
    match value {
        Some(n) => n.to_string(),
        None => "unknown".dimmed().to_string(),
    }
}

fn fmt_flag(value: Option<bool>, on: &str, off: &str) -> String {
    match value {
        Some(true) => on.to_string(),
        Some(false) => off.to_string(),
        None => "unknown".dimmed().to_string(),
    }
}

pub(crate) fn print_findings(findings: &[Finding]) {
    for finding in findings {
        println!("  {} {}", severity_label(finding.severity), finding.message);
    }
}

pub(crate) fn print_recommendations(recommendations: &[String]) {
    for rec in recommendations {
        println!("  {} {}", "→".cyan(), rec);
    }
}

fn print_table(report: &AuditReport) {
    let snapshot = &report.snapshot;

    println!("{}", "═══ System Audit Report ═══".cyan().bold());
    println!("  Hostname:      {}", snapshot.hostname.bold());
    println!("  Audited At:    {}", snapshot.timestamp.to_rfc3339());
    println!("  Risk Score:    {}", risk_label(report.risk_score));
    println!(
        "  Severity:      {}",
        severity_label(report.overall_severity)
    );

    println!();
    println!("{}", "── System Health ──".yellow());
    if let Some(load) = snapshot.cpu.load_1min {
        println!(
            "  Load (1m):     {:.2} on {} cores",
            load,
            fmt_count(snapshot.cpu.cores)
        );
    }
    println!("  CPU Usage:     {}", fmt_percent(snapshot.cpu.usage_percent));
    println!(
        "  Memory Usage:  {}",
        fmt_percent(snapshot.memory.usage_percent)
    );
    if let (Some(used), Some(total)) = (snapshot.memory.used_mb, snapshot.memory.total_mb) {
        println!("  Memory:        {} MB / {} MB", used, total);
    }
    println!("  Disk Usage:    {}", fmt_percent(snapshot.disk.usage_percent));

    println!();
    println!("{}", "── Security Configuration ──".yellow());
    println!(
        "  SSH Config:    {}",
        fmt_flag(snapshot.ssh.config_exists, "present", "missing")
    );
    println!(
        "  Root Login:    {}",
        match snapshot.ssh.root_login_enabled {
            Some(true) => "enabled".red().to_string(),
            Some(false) => "disabled".green().to_string(),
            None => "unknown".dimmed().to_string(),
        }
    );
    println!(
        "  Password Auth: {}",
        match snapshot.ssh.password_auth_enabled {
            Some(true) => "enabled".yellow().to_string(),
            Some(false) => "disabled".green().to_string(),
            None => "unknown".dimmed().to_string(),
        }
    );
    println!(
        "  SSHD Running:  {}",
        fmt_flag(snapshot.ssh.service_running, "yes", "no")
    );
    println!(
        "  Users Online:  {}{}",
        fmt_count(snapshot.users.logged_in_count),
        if snapshot.users.root_logged_in == Some(true) {
            " (root session active)".red().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "  Services:      {} running",
        fmt_count(snapshot.services.active_count)
    );

    println!();
    println!("{}", "── Log Intelligence ──".yellow());
    println!(
        "  Auth Failures: {}",
        fmt_count(snapshot.logs.auth_failure_count)
    );
    println!(
        "  Failing Svcs:  {}",
        match &snapshot.logs.service_error_names {
            Some(names) if names.is_empty() => "none".to_string(),
            Some(names) => names.iter().cloned().collect::<Vec<_>>().join(", "),
            None => "unknown".dimmed().to_string(),
        }
    );
    println!(
        "  Kernel Errors: {}",
        fmt_count(snapshot.logs.kernel_error_count)
    );
    println!(
        "  Segfaults:     {}",
        fmt_count(snapshot.logs.segfault_count)
    );

    println!();
    println!("{}", "── Findings ──".yellow());
    print_findings(&report.findings);

    println!();
    println!("{}", "── Recommendations ──".yellow());
    print_recommendations(&report.recommendations);

    if let Some(processes) = &report.processes {
        println!();
        println!("{}", "── Process Snapshot ──".yellow());
        println!(
            "  Total: {}  Running: {}  Zombie: {}",
            processes.total_processes,
            processes.running_processes,
            if processes.zombie_processes > 0 {
                processes.zombie_processes.to_string().red().to_string()
            } else {
                processes.zombie_processes.to_string()
            }
        );
        if !processes.top_cpu.is_empty() {
            println!("  {}", "Top CPU:".dimmed());
            for p in &processes.top_cpu {
                println!(
                    "    {:>6} {:<40} CPU: {:>5.1}%  MEM: {:>5.1}%",
                    p.pid, p.name, p.cpu_percent, p.memory_percent
                );
            }
        }
        if !processes.top_memory.is_empty() {
            println!("  {}", "Top Memory:".dimmed());
            for p in &processes.top_memory {
                println!(
                    "    {:>6} {:<40} MEM: {:>5.1}%  CPU: {:>5.1}%",
                    p.pid, p.name, p.memory_percent, p.cpu_percent
                );
            }
        }
    }
}
