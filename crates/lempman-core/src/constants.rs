//! Constants and default values for LEMP Manager

use std::path::PathBuf;

/// Default config directory name (under the user's home)
pub const LEMPMAN_DIR: &str = ".lempman";

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "lempman.toml";

/// Database file name
pub const DB_FILE: &str = "lempman.db";

/// Monitoring config singleton
pub const MONITORING_FILE: &str = "monitoring.json";

/// Telegram config singleton
pub const TELEGRAM_FILE: &str = "telegram.json";

/// Generated JWT signing secret
pub const SECRET_FILE: &str = "secret.key";

/// Deployment workspaces directory name
pub const DEPLOY_DIR: &str = "deploy";

/// Default bind address for the console
pub const DEFAULT_BIND: &str = "0.0.0.0:3001";

/// Default CORS origin
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3001";

/// Session cookie name
pub const AUTH_COOKIE: &str = "auth";

/// Session lifetime without "remember me"
pub const SESSION_TTL_HOURS: i64 = 24;

/// Session lifetime with "remember me"
pub const REMEMBER_ME_TTL_DAYS: i64 = 7;

/// Name of the account created on first boot; it can never be deleted
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Initial password of the default admin
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// bcrypt cost used for new hashes
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Default timeout for probe commands in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Default timeout for the installer run in seconds
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 3600;

/// Deployment workspaces older than this are pruned on the next check
pub const DEPLOY_WORKSPACE_TTL_SECS: u64 = 24 * 3600;

/// Lower bound for the server-side watcher interval
pub const MIN_WATCH_INTERVAL_SECS: u64 = 5;

/// Default log page size
pub const DEFAULT_LOG_PAGE_SIZE: u32 = 25;

/// Largest log page a client may request
pub const MAX_LOG_PAGE_SIZE: u32 = 500;

/// Services checked by default
pub const DEFAULT_SERVICES: &[&str] = &[
    "nginx",
    "php8.2-fpm",
    "mysql",
    "redis-server",
    "rabbitmq-server",
    "varnish",
    "opensearch",
    "memcached",
];

/// Components the installer knows about
pub const DEPLOY_COMPONENTS: &[&str] = &[
    "nginx",
    "php",
    "mysql",
    "redis",
    "varnish",
    "opensearch",
    "rabbitmq",
];

/// Get the default config directory
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(LEMPMAN_DIR))
        .unwrap_or_else(|| PathBuf::from(LEMPMAN_DIR))
}
