//! `hostaudit baseline` — save, list, compare, and delete baselines.

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::domain::baseline::{BaselineStore, StoreError};
use crate::domain::collector::SnapshotCollector;
use crate::domain::drift::{self, DriftReport};
use crate::domain::normalize::normalize;
use crate::domain::snapshot::StoredBaseline;

use super::audit::severity_label;

pub fn save(name: Option<&str>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(save_async(name))
}

async fn save_async(name: Option<&str>) -> Result<()> {
    let store = open_store()?;

    println!("Collecting system data for baseline...");
    let raw = SnapshotCollector::collect().await;
    let snapshot = normalize(raw);

    let stored = store.save(snapshot, name).await?;
    println!(
        "{} {} ({})",
        "Baseline saved:".green(),
        stored.name.bold(),
        stored.created_at.to_rfc3339()
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(list_async())
}

async fn list_async() -> Result<()> {
    let store = open_store()?;
    let names = store.list().await?;

    if names.is_empty() {
        println!("No baselines saved yet. Run `hostaudit baseline save` first.");
        return Ok(());
    }

    println!("{}", "Saved baselines:".bold());
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

pub fn compare(name: Option<&str>, format: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(compare_async(name, format))
}

async fn compare_async(name: Option<&str>, format: &str) -> Result<()> {
    let store = open_store()?;

    let baseline = match name {
        Some(n) => store.get(n).await,
        None => store.latest().await,
    };
    let baseline = match baseline {
        Ok(b) => b,
        Err(e @ StoreError::NotFound { .. }) => {
            report_missing(&store, &e).await;
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let raw = SnapshotCollector::collect().await;
    let current = normalize(raw);
    let report = drift::diff(&current, &baseline);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_drift(&baseline, &report);
    Ok(())
}

pub fn delete(name: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(delete_async(name))
}

async fn delete_async(name: &str) -> Result<()> {
    let store = open_store()?;
    match store.delete(name).await {
        Ok(()) => {
            println!("{} {}", "Baseline deleted:".green(), name.bold());
            Ok(())
        }
        Err(e @ StoreError::NotFound { .. }) => {
            report_missing(&store, &e).await;
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn open_store() -> Result<BaselineStore> {
    let cfg: Config = crate::config::load()?;
    Ok(BaselineStore::new(cfg.baseline_dir()?))
}

/// NotFound guidance: always show what is actually available.
async fn report_missing(store: &BaselineStore, error: &StoreError) {
    eprintln!("{} {}", "Error:".red(), error);
    match store.list().await {
        Ok(names) if names.is_empty() => {
            eprintln!("No baselines saved yet. Run `hostaudit baseline save` first.");
        }
        Ok(names) => {
            eprintln!("Available baselines: {}", names.join(", "));
        }
        Err(e) => {
            eprintln!("Could not list baselines: {}", e);
        }
    }
}

fn print_drift(baseline: &StoredBaseline, report: &DriftReport) {
    println!("{}", "═══ Baseline Comparison ═══".cyan().bold());
    println!(
        "  Baseline:      {} ({})",
        report.compared_against.bold(),
        baseline.created_at.to_rfc3339()
    );
    println!(
        "  Risk Score:    {} → {}",
        report.baseline_risk.value, report.current_risk.value
    );

    println!();
    println!("{}", "── Field Deltas ──".yellow());
    let mut printed = 0;
    for delta in &report.field_deltas {
        match delta.change {
            Some(change) if change != 0.0 => {
                println!(
                    "  {:<28} {} → {} ({:+.1})",
                    delta.field, delta.old, delta.new, change
                );
                printed += 1;
            }
            Some(_) => {}
            None => {
                println!("  {:<28} {} → {}", delta.field, delta.old, delta.new);
                printed += 1;
            }
        }
    }
    if printed == 0 {
        println!("  No significant changes detected.");
    }

    if !report.new_findings.is_empty() {
        println!();
        println!("{}", "── New Findings ──".yellow());
        for finding in &report.new_findings {
            println!("  {} {}", severity_label(finding.severity), finding.message);
        }
    }

    if !report.resolved_findings.is_empty() {
        println!();
        println!("{}", "── Resolved Findings ──".yellow());
        for finding in &report.resolved_findings {
            println!(
                "  {} {}",
                severity_label(finding.severity),
                finding.message
            );
        }
    }
}
