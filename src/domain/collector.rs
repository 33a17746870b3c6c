//! Local collectors — read /proc and shell out for raw audit inputs.
//!
//! Every probe degrades to "unavailable" instead of failing the run; the
//! normalizer turns whatever survives into the canonical snapshot. Probes
//! target Linux; on other platforms the affected leaves come back unknown.

use std::collections::BTreeSet;

use tokio::process::Command;
use tracing::warn;

use super::normalize::{
    RawCpu, RawDisk, RawLogs, RawMemory, RawMetrics, RawServices, RawSsh, RawUsers,
};

const SSHD_CONFIG_PATH: &str = "/etc/ssh/sshd_config";

/// How many recent log lines each excerpt probe asks for.
const LOG_EXCERPT_LINES: &str = "500";

pub struct SnapshotCollector;

impl SnapshotCollector {
    /// Gather raw metrics from the local host.
    pub async fn collect() -> RawMetrics {
        let (cpu, memory, disk, users, services, ssh, logs) = tokio::join!(
            Self::collect_cpu(),
            Self::collect_memory(),
            Self::collect_disk(),
            Self::collect_users(),
            Self::collect_services(),
            Self::collect_ssh(),
            Self::collect_logs(),
        );

        RawMetrics {
            hostname: Some(gethostname()),
            cpu,
            memory,
            disk,
            users,
            services,
            ssh,
            logs,
        }
    }

    async fn collect_cpu() -> RawCpu {
        let load_1min = tokio::fs::read_to_string("/proc/loadavg")
            .await
            .ok()
            .and_then(|s| s.split_whitespace().next().and_then(|v| v.parse().ok()));

        let cores = tokio::fs::read_to_string("/proc/cpuinfo")
            .await
            .ok()
            .map(|s| s.lines().filter(|l| l.starts_with("processor")).count() as i64)
            .filter(|&n| n > 0);

        RawCpu {
            load_1min,
            cores,
            usage_percent: Self::sample_cpu_usage().await,
        }
    }

    /// CPU usage from /proc/stat, delta between two reads 200ms apart.
    async fn sample_cpu_usage() -> Option<f64> {
        let read_cpu_stat = || async {
            tokio::fs::read_to_string("/proc/stat").await.ok().and_then(|s| {
                s.lines().next().and_then(|l| {
                    let parts: Vec<u64> = l
                        .split_whitespace()
                        .skip(1)
                        .filter_map(|v| v.parse().ok())
                        .collect();
                    if parts.len() >= 4 {
                        let idle = parts[3];
                        let total: u64 = parts.iter().sum();
                        Some((idle, total))
                    } else {
                        None
                    }
                })
            })
        };

        let before = read_cpu_stat().await?;
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let after = read_cpu_stat().await?;

        let idle_delta = after.0.saturating_sub(before.0) as f64;
        let total_delta = after.1.saturating_sub(before.1) as f64;
        if total_delta > 0.0 {
            Some(((total_delta - idle_delta) / total_delta) * 100.0)
        } else {
            None
        }
    }

    async fn collect_memory() -> RawMemory {
        let Ok(meminfo) = tokio::fs::read_to_string("/proc/meminfo").await else {
            return RawMemory::default();
        };

        let total_kb = parse_meminfo_kb(&meminfo, "MemTotal:");
        let available_kb = parse_meminfo_kb(&meminfo, "MemAvailable:");

        match (total_kb, available_kb) {
            (Some(total), Some(available)) if total > 0 => {
                let used = total.saturating_sub(available);
                RawMemory {
                    total_mb: Some((total / 1024) as i64),
                    used_mb: Some((used / 1024) as i64),
                    available_mb: Some((available / 1024) as i64),
                    usage_percent: Some((used as f64 / total as f64) * 100.0),
                }
            }
            _ => RawMemory::default(),
        }
    }

    /// Root filesystem usage from `df -k /`.
    async fn collect_disk() -> RawDisk {
        let Some(output) = run_cmd("df", &["-k", "/"]).await else {
            return RawDisk::default();
        };

        let Some(line) = output.lines().nth(1) else {
            return RawDisk::default();
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            return RawDisk::default();
        }

        let total_kb: Option<i64> = parts.get(1).and_then(|v| v.parse().ok());
        let used_kb: Option<i64> = parts.get(2).and_then(|v| v.parse().ok());
        let available_kb: Option<i64> = parts.get(3).and_then(|v| v.parse().ok());
        let usage_percent = parts
            .get(4)
            .and_then(|v| v.trim_end_matches('%').parse::<f64>().ok());

        RawDisk {
            usage_percent,
            total_mb: total_kb.map(|v| v / 1024),
            used_mb: used_kb.map(|v| v / 1024),
            available_mb: available_kb.map(|v| v / 1024),
        }
    }

    async fn collect_users() -> RawUsers {
        let Some(output) = run_cmd("who", &[]).await else {
            return RawUsers::default();
        };

        let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
        let root_logged_in = lines
            .iter()
            .any(|l| l.split_whitespace().next() == Some("root"));

        RawUsers {
            logged_in_count: Some(lines.len() as i64),
            root_logged_in: Some(root_logged_in),
        }
    }

    async fn collect_services() -> RawServices {
        let output = run_cmd(
            "systemctl",
            &[
                "list-units",
                "--type=service",
                "--state=running",
                "--no-legend",
                "--plain",
            ],
        )
        .await;

        let Some(output) = output else {
            return RawServices::default();
        };

        let names: BTreeSet<String> = output
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .filter(|unit| unit.ends_with(".service"))
            .map(|unit| unit.trim_end_matches(".service").to_string())
            .collect();

        RawServices {
            active_count: Some(names.len() as i64),
            active_names: Some(names),
        }
    }

    async fn collect_ssh() -> RawSsh {
        let config_exists = tokio::fs::try_exists(SSHD_CONFIG_PATH).await.ok();

        let (root_login_enabled, password_auth_enabled) =
            match tokio::fs::read_to_string(SSHD_CONFIG_PATH).await {
                Ok(content) => {
                    let (root, password) = parse_sshd_config(&content);
                    (Some(root), Some(password))
                }
                Err(e) => {
                    if config_exists == Some(true) {
                        warn!(error = %e, "sshd_config exists but could not be read");
                    }
                    (None, None)
                }
            };

        // pgrep exits nonzero both when no process matches and when it is
        // missing; only a spawn failure maps to unknown.
        let service_running = match Command::new("pgrep").args(["-x", "sshd"]).output().await {
            Ok(output) => Some(output.status.success()),
            Err(_) => None,
        };

        RawSsh {
            config_exists,
            root_login_enabled,
            password_auth_enabled,
            service_running,
        }
    }

    async fn collect_logs() -> RawLogs {
        let (auth_excerpt, system_excerpt) = tokio::join!(
            Self::collect_auth_log_excerpt(),
            Self::collect_system_log_excerpt(),
        );

        let mut logs = RawLogs::default();

        if let Some(text) = auth_excerpt {
            logs.auth_failure_count = Some(count_auth_failures(&text));
        }

        if let Some(text) = system_excerpt {
            let parsed = parse_system_log(&text);
            logs.service_error_names = Some(parsed.service_errors);
            logs.kernel_error_count = Some(parsed.kernel_errors);
            logs.segfault_count = Some(parsed.segfaults);
        }

        logs
    }

    /// Authentication log lines, journald first, auth.log as fallback.
    async fn collect_auth_log_excerpt() -> Option<String> {
        if let Some(output) = run_cmd(
            "journalctl",
            &["-t", "sshd", "-n", LOG_EXCERPT_LINES, "--no-pager", "-q"],
        )
        .await
        {
            return Some(output);
        }

        let content = tokio::fs::read_to_string("/var/log/auth.log").await.ok()?;
        let lines: Vec<&str> = content.lines().collect();
        let tail = lines.len().saturating_sub(500);
        Some(lines[tail..].join("\n"))
    }

    async fn collect_system_log_excerpt() -> Option<String> {
        run_cmd(
            "journalctl",
            &["-p", "err", "-n", LOG_EXCERPT_LINES, "--no-pager", "-q"],
        )
        .await
    }
}

/// Parsed system-log error signals.
#[derive(Debug, Default, PartialEq)]
pub struct SystemLogSignals {
    pub service_errors: BTreeSet<String>,
    pub kernel_errors: i64,
    pub segfaults: i64,
}

/// Count failed-authentication lines in an auth log excerpt.
pub fn count_auth_failures(text: &str) -> i64 {
    text.lines()
        .map(|l| l.to_lowercase())
        .filter(|l| l.contains("failed password") || l.contains("authentication failure"))
        .count() as i64
}

/// Extract failing service names, kernel errors, and segfaults from a
/// system error-log excerpt.
pub fn parse_system_log(text: &str) -> SystemLogSignals {
    let mut signals = SystemLogSignals::default();

    for line in text.lines() {
        let lower = line.to_lowercase();
        if lower.trim().is_empty() {
            continue;
        }

        if lower.contains("segfault") || lower.contains("segmentation fault") {
            signals.segfaults += 1;
        }
        if lower.contains("kernel") && (lower.contains("error") || lower.contains("fail")) {
            signals.kernel_errors += 1;
        }
        if let Some(service) = extract_service_name(&lower) {
            signals.service_errors.insert(service);
        }
    }

    signals
}

/// PermitRootLogin / PasswordAuthentication directives, last one wins.
/// Upstream defaults are permissive when a directive is absent.
pub fn parse_sshd_config(content: &str) -> (bool, bool) {
    let mut root_login = true;
    let mut password_auth = true;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if lower.starts_with("permitrootlogin") {
            root_login = !lower.contains("no");
        }
        if lower.starts_with("passwordauthentication") {
            password_auth = !lower.contains("no");
        }
    }

    (root_login, password_auth)
}

/// Pull `<name>.service` out of a log line, e.g.
/// "nginx.service: Failed with result 'exit-code'".
fn extract_service_name(line: &str) -> Option<String> {
    let idx = line.find(".service")?;
    let head = &line[..idx];
    let start = head
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '@' || c == '.'))
        .map(|i| i + 1)
        .unwrap_or(0);
    let name = &head[start..];
    if name.is_empty() || !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(name.to_string())
}

fn parse_meminfo_kb(meminfo: &str, field: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|l| l.starts_with(field))
        .and_then(|l| l.split_whitespace().nth(1).and_then(|v| v.parse().ok()))
}

async fn run_cmd(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().await.ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        None
    }
}

fn gethostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".into())
}
