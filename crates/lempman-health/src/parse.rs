//! Parsers for the text output of system tools.
//!
//! Every parser is total: anything it cannot read comes back as zero.

use lempman_core::ServiceState;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::{NginxConnections, Usage};

static ACTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Active connections:\s*(\d+)").expect("Invalid active regex"));

static RWW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Reading:\s*(\d+)\s+Writing:\s*(\d+)\s+Waiting:\s*(\d+)").expect("Invalid rww regex")
});

static COUNTERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(\d+)\s+(\d+)\s*$").expect("Invalid counters regex"));

static IDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d.]+)\s*%?\s*id\b").expect("Invalid idle regex"));

static CACHE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\w-]+\s*:\s*([01])\s*$").expect("Invalid cache regex"));

/// Map `systemctl is-active` output to a state
pub fn service_state(stdout: &str) -> ServiceState {
    match stdout.trim() {
        "active" | "reloading" => ServiceState::Running,
        "failed" => ServiceState::Error,
        _ => ServiceState::Stopped,
    }
}

/// Parse `free -b`: the `Mem:` row's total, used and free columns
pub fn memory(output: &str) -> Usage {
    output
        .lines()
        .find(|l| l.trim_start().starts_with("Mem:"))
        .map(|l| columns(l, 1))
        .unwrap_or_default()
}

/// Parse `df -B1 <mount>`: the first data row's size, used and avail columns
pub fn disk(output: &str) -> Usage {
    output
        .lines()
        .nth(1)
        .map(|l| columns(l, 1))
        .unwrap_or_default()
}

fn columns(line: &str, skip: usize) -> Usage {
    let mut nums = line
        .split_whitespace()
        .skip(skip)
        .map(|v| v.parse::<u64>().unwrap_or(0));
    let total = nums.next().unwrap_or(0);
    let used = nums.next().unwrap_or(0);
    let free = nums.next().unwrap_or(0);
    Usage::new(total, used, free)
}

/// CPU usage from `top -bn1`, computed as 100 minus the idle share
pub fn cpu_usage(output: &str) -> f64 {
    output
        .lines()
        .find(|l| l.contains("Cpu(s)"))
        .and_then(|l| IDLE_RE.captures(&l.replace(',', " ")).map(|c| c[1].to_string()))
        .and_then(|idle| idle.parse::<f64>().ok())
        .map(|idle| (100.0 - idle).clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// Raw `stub_status` counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubStatus {
    pub connections: NginxConnections,
    pub accepts: u64,
    pub handled: u64,
    pub requests: u64,
}

/// Parse an nginx `stub_status` block
pub fn stub_status(output: &str) -> StubStatus {
    let mut stub = StubStatus::default();

    if let Some(c) = ACTIVE_RE.captures(output) {
        stub.connections.active = c[1].parse().unwrap_or(0);
    }
    if let Some(c) = RWW_RE.captures(output) {
        stub.connections.reading = c[1].parse().unwrap_or(0);
        stub.connections.writing = c[2].parse().unwrap_or(0);
        stub.connections.waiting = c[3].parse().unwrap_or(0);
    }
    if let Some(c) = output.lines().find_map(|l| COUNTERS_RE.captures(l)) {
        stub.accepts = c[1].parse().unwrap_or(0);
        stub.handled = c[2].parse().unwrap_or(0);
        stub.requests = c[3].parse().unwrap_or(0);
    }

    stub
}

/// Magento `deploy:mode:show`, e.g. "Current application mode: production."
pub fn magento_mode(output: &str) -> String {
    let line = output.trim();
    let mode = line
        .rsplit(':')
        .next()
        .unwrap_or("")
        .trim()
        .trim_end_matches('.')
        .trim();

    if mode.is_empty() {
        "unknown".to_string()
    } else {
        mode.to_string()
    }
}

/// Magento `cache:status`: (enabled, total) cache types
pub fn magento_cache(output: &str) -> (u32, u32) {
    let mut enabled = 0;
    let mut total = 0;

    for line in output.lines() {
        if let Some(c) = CACHE_LINE_RE.captures(line) {
            total += 1;
            if &c[1] == "1" {
                enabled += 1;
            }
        }
    }

    (enabled, total)
}

/// First integer in a `mysql -N` result
pub fn count(output: &str) -> u64 {
    output
        .split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
