//! Process snapshot — optional `ps aux` capture for `audit --full`.
//!
//! Display-only context; never part of a `SystemSnapshot` and never scored.

use serde::Serialize;
use tokio::process::Command;

#[derive(Debug, Default, Serialize)]
pub struct ProcessSnapshot {
    pub total_processes: u32,
    pub running_processes: u32,
    pub zombie_processes: u32,
    pub top_cpu: Vec<ProcessInfo>,
    pub top_memory: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Capture the current process table. Returns `None` when `ps` is
/// unavailable.
pub async fn collect() -> Option<ProcessSnapshot> {
    let output = Command::new("ps").arg("aux").output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    Some(parse_ps_aux(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_ps_aux(output: &str) -> ProcessSnapshot {
    let mut total: u32 = 0;
    let mut running: u32 = 0;
    let mut zombie: u32 = 0;
    let mut procs: Vec<ProcessInfo> = Vec::new();

    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 11 {
            continue;
        }

        total += 1;

        let stat = parts[7];
        if stat.starts_with('R') {
            running += 1;
        }
        if stat.starts_with('Z') {
            zombie += 1;
        }

        procs.push(ProcessInfo {
            pid: parts[1].parse().unwrap_or(0),
            name: parts[10..].join(" "),
            cpu_percent: parts[2].parse().unwrap_or(0.0),
            memory_percent: parts[3].parse().unwrap_or(0.0),
        });
    }

    let top_cpu = top_by(&procs, |p| p.cpu_percent);
    let top_memory = top_by(&procs, |p| p.memory_percent);

    ProcessSnapshot {
        total_processes: total,
        running_processes: running,
        zombie_processes: zombie,
        top_cpu,
        top_memory,
    }
}

fn top_by(procs: &[ProcessInfo], key: impl Fn(&ProcessInfo) -> f64) -> Vec<ProcessInfo> {
    let mut sorted: Vec<ProcessInfo> = procs.to_vec();
    sorted.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(std::cmp::Ordering::Equal));
    sorted.into_iter().take(5).filter(|p| key(p) > 0.0).collect()
}
