//! Table, JSON and message output

use colored::Colorize;
use lempman_core::{ServiceState, User};
use lempman_health::SystemStatus;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Global flag for JSON output mode
static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_json_mode(enabled: bool) {
    JSON_MODE.store(enabled, Ordering::SeqCst);
}

pub fn is_json_mode() -> bool {
    JSON_MODE.load(Ordering::SeqCst)
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing to JSON: {}", e),
    }
}

#[derive(Tabled)]
pub struct ServiceRow {
    #[tabled(rename = "service")]
    pub name: String,
    #[tabled(rename = "status")]
    pub status: String,
    #[tabled(rename = "detail")]
    pub detail: String,
}

#[derive(Tabled)]
pub struct SiteRow {
    #[tabled(rename = "site")]
    pub name: String,
    #[tabled(rename = "mode")]
    pub mode: String,
    #[tabled(rename = "cache")]
    pub cache: String,
    #[tabled(rename = "orders today")]
    pub orders: u64,
    #[tabled(rename = "active users")]
    pub active_users: u64,
}

#[derive(Tabled)]
pub struct UserRow {
    #[tabled(rename = "username")]
    pub username: String,
    #[tabled(rename = "role")]
    pub role: String,
    #[tabled(rename = "created")]
    pub created: String,
    #[tabled(rename = "last login")]
    pub last_login: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        UserRow {
            username: user.username.clone(),
            role: user.role.to_string(),
            created: user.created_at.format("%Y-%m-%d %H:%M").to_string(),
            last_login: user
                .last_login
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
        }
    }
}

fn format_state(state: ServiceState) -> String {
    match state {
        ServiceState::Running => "running".green().to_string(),
        ServiceState::Stopped => "stopped".yellow().to_string(),
        ServiceState::Error => "error".red().bold().to_string(),
    }
}

pub fn print_system_status(status: &SystemStatus) {
    if is_json_mode() {
        print_json(status);
        return;
    }

    println!("{}", "─".repeat(50));
    println!("  {} │ {}", "Uptime".bold(), status.uptime);
    println!("  {} │ {:.1}%", "CPU".bold(), status.cpu.usage);
    println!(
        "  {} │ {:.1}% ({} / {})",
        "Memory".bold(),
        status.memory.usage,
        format_bytes(status.memory.used),
        format_bytes(status.memory.total)
    );
    println!(
        "  {} │ {:.1}% ({} / {})",
        "Disk".bold(),
        status.disk.usage,
        format_bytes(status.disk.used),
        format_bytes(status.disk.total)
    );
    println!("{}", "─".repeat(50));

    let rows: Vec<ServiceRow> = status
        .services
        .iter()
        .map(|(name, s)| ServiceRow {
            name: name.clone(),
            status: format_state(s.status),
            detail: s.error.clone().unwrap_or_default(),
        })
        .collect();
    if rows.is_empty() {
        println!("No services configured");
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if !status.sites.is_empty() {
        let rows: Vec<SiteRow> = status
            .sites
            .values()
            .map(|site| SiteRow {
                name: site.name.clone(),
                mode: site.status.mode.clone(),
                cache: format!(
                    "{}/{}",
                    site.status.cache_status.enabled, site.status.cache_status.total
                ),
                orders: site.status.orders.today,
                active_users: site.status.active_users,
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
}

pub fn print_users(users: &[User]) {
    if is_json_mode() {
        print_json(users);
        return;
    }

    if users.is_empty() {
        println!("No users");
        return;
    }

    let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1}G", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.0}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

/// Show the first and last few characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn print_success(message: &str) {
    if is_json_mode() {
        print_json(&serde_json::json!({ "success": true, "message": message }));
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

pub fn print_error(message: &str) {
    if is_json_mode() {
        eprintln!("{}", serde_json::json!({ "success": false, "message": message }));
    } else {
        eprintln!("{} {}", "✗".red(), message);
    }
}

pub fn print_info(message: &str) {
    if !is_json_mode() {
        println!("{} {}", "ℹ".blue(), message);
    }
}
