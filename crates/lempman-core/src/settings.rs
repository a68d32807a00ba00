//! Console settings
//!
//! Resolution order: built-in defaults, then `lempman.toml` (from the config
//! directory or an explicit path), then environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::fsutil;

/// Nginx probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NginxSettings {
    /// URL of the `stub_status` location
    pub status_url: String,
}

impl Default for NginxSettings {
    fn default() -> Self {
        Self {
            status_url: "http://localhost/nginx_status".to_string(),
        }
    }
}

/// Magento probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MagentoSettings {
    /// Database queried for orders and visitors
    pub database: String,
    /// Store whose orders are counted
    pub store_id: u32,
}

impl Default for MagentoSettings {
    fn default() -> Self {
        Self {
            database: "magento".to_string(),
            store_id: 1,
        }
    }
}

/// Monitoring stack endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringEndpoints {
    pub prometheus_url: String,
    pub alertmanager_url: String,
    pub grafana_url: String,
}

impl Default for MonitoringEndpoints {
    fn default() -> Self {
        Self {
            prometheus_url: "http://localhost:9090".to_string(),
            alertmanager_url: "http://localhost:9093".to_string(),
            grafana_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Log index connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchSettings {
    pub node: String,
    pub username: String,
    pub password: String,
    pub index: String,
    /// Accept self-signed certificates on the search node
    pub accept_invalid_certs: bool,
}

impl Default for OpenSearchSettings {
    fn default() -> Self {
        Self {
            node: "https://localhost:9200".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            index: "logs".to_string(),
            accept_invalid_certs: true,
        }
    }
}

/// Remote deployment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    pub precheck_script: PathBuf,
    pub install_script: PathBuf,
    /// Workspace root; defaults to `<config_dir>/deploy`
    pub work_dir: Option<PathBuf>,
    pub check_timeout_secs: u64,
    pub install_timeout_secs: u64,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            precheck_script: PathBuf::from("ansible/scripts/check/pre-check.sh"),
            install_script: PathBuf::from("ansible/scripts/install/install.sh"),
            work_dir: None,
            check_timeout_secs: 300,
            install_timeout_secs: DEFAULT_INSTALL_TIMEOUT_SECS,
        }
    }
}

/// Top-level console settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub bind: String,
    pub cors_origin: String,
    pub jwt_secret: Option<String>,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub default_admin_password: String,
    /// systemd units shown on the dashboard and watched for transitions
    pub services: Vec<String>,
    pub command_timeout_secs: u64,
    /// Run the server-side status watcher
    pub watch: bool,
    pub nginx: NginxSettings,
    pub magento: MagentoSettings,
    pub monitoring: MonitoringEndpoints,
    pub opensearch: OpenSearchSettings,
    pub deploy: DeploySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            bind: DEFAULT_BIND.to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            jwt_secret: None,
            cookie_secure: false,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            default_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            services: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            watch: true,
            nginx: NginxSettings::default(),
            magento: MagentoSettings::default(),
            monitoring: MonitoringEndpoints::default(),
            opensearch: OpenSearchSettings::default(),
            deploy: DeploySettings::default(),
        }
    }
}

impl Settings {
    /// Settings rooted at a specific directory, without reading any file
    pub fn with_config_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Load settings from an explicit file or the config directory, then
    /// apply the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut settings = Self::load_file(config_file, |key| std::env::var(key).ok())?;
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    fn load_file(
        config_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let config_dir = env("LEMPMAN_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_config_dir);

        let path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                path.to_path_buf()
            }
            None => {
                let path = config_dir.join(SETTINGS_FILE);
                if !path.exists() {
                    debug!("No settings file at {}, using defaults", path.display());
                    return Ok(Self::with_config_dir(config_dir));
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        // An explicit config_dir in the file wins over the default location
        let table: toml::Table = toml::from_str(&content)?;
        if !table.contains_key("config_dir") {
            settings.config_dir = config_dir;
        }

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse settings from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = env("LEMPMAN_CONFIG_DIR") {
            self.config_dir = PathBuf::from(dir);
        }
        if let Some(bind) = env("LEMPMAN_BIND") {
            self.bind = bind;
        }
        if let Some(origin) = env("LEMPMAN_CORS_ORIGIN") {
            self.cors_origin = origin;
        }
        if let Some(secret) = env("JWT_SECRET").filter(|s| !s.is_empty()) {
            self.jwt_secret = Some(secret);
        }
        if let Some(secure) = env("COOKIE_SECURE") {
            self.cookie_secure = matches!(secure.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(node) = env("OPENSEARCH_NODE") {
            self.opensearch.node = node;
        }
        if let Some(user) = env("OPENSEARCH_USERNAME") {
            self.opensearch.username = user;
        }
        if let Some(password) = env("OPENSEARCH_PASSWORD") {
            self.opensearch.password = password;
        }
        if let Some(url) = env("PROMETHEUS_URL") {
            self.monitoring.prometheus_url = url;
        }
        if let Some(url) = env("ALERTMANAGER_URL") {
            self.monitoring.alertmanager_url = url;
        }
        if let Some(url) = env("GRAFANA_URL") {
            self.monitoring.grafana_url = url;
        }
        if let Some(url) = env("NGINX_STATUS_URL") {
            self.nginx.status_url = url;
        }
    }

    /// Reject settings that would make the console unusable or unsafe
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .services
            .iter()
            .find(|s| !crate::types::validate_service_name(s))
        {
            return Err(Error::config(format!("Invalid service name: {}", bad)));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(Error::config(format!(
                "bcrypt_cost must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }
        if self.command_timeout_secs == 0 {
            return Err(Error::config("command_timeout_secs must be positive"));
        }
        // Credentialed CORS cannot be combined with a wildcard origin
        if !is_valid_origin(&self.cors_origin) {
            return Err(Error::config(format!(
                "cors_origin must be a single scheme://host[:port] origin, got '{}'",
                self.cors_origin
            )));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.config_dir.join(DB_FILE)
    }

    pub fn monitoring_path(&self) -> PathBuf {
        self.config_dir.join(MONITORING_FILE)
    }

    pub fn telegram_path(&self) -> PathBuf {
        self.config_dir.join(TELEGRAM_FILE)
    }

    pub fn secret_path(&self) -> PathBuf {
        self.config_dir.join(SECRET_FILE)
    }

    pub fn deploy_dir(&self) -> PathBuf {
        self.deploy
            .work_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join(DEPLOY_DIR))
    }

    /// Return the JWT secret, generating and persisting one on first use
    pub fn ensure_jwt_secret(&mut self) -> Result<String> {
        if let Some(secret) = &self.jwt_secret {
            return Ok(secret.clone());
        }

        let path = self.secret_path();
        let secret = match std::fs::read_to_string(&path) {
            Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
            Ok(_) => Self::generate_secret(&path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::generate_secret(&path)?,
            Err(e) => return Err(e.into()),
        };

        self.jwt_secret = Some(secret.clone());
        Ok(secret)
    }

    fn generate_secret(path: &Path) -> Result<String> {
        let secret = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        fsutil::write_private(path, secret.as_bytes())?;
        info!("Generated session signing secret at {}", path.display());
        Ok(secret)
    }
}

/// A single `http(s)://host[:port]` origin without path or wildcard
fn is_valid_origin(origin: &str) -> bool {
    let Some(host) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}
