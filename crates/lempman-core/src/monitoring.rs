//! Monitoring configuration singleton

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fsutil;

/// Sections a client must send when replacing the config
pub const REQUIRED_SECTIONS: &[&str] = &["levels", "intervals", "notifications", "thresholds"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub basic: bool,
    pub performance: bool,
    pub security: bool,
}

/// Polling intervals in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    pub basic: u64,
    pub performance: u64,
    pub security: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationToggles {
    pub status: bool,
    pub performance: bool,
    pub security: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Active nginx connections
    pub connections: u64,
    /// Percent of 5xx responses
    pub error_rate: f64,
    /// Milliseconds
    pub response_time: u64,
}

/// Which Prometheus exporters are expected on the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exporters {
    pub node: bool,
    pub nginx: bool,
    pub mysql: bool,
    pub redis: bool,
    pub php_fpm: bool,
}

/// Monitoring configuration, one per deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub levels: Levels,
    pub intervals: Intervals,
    pub notifications: NotificationToggles,
    pub thresholds: Thresholds,
    pub exporters: Exporters,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            levels: Levels {
                basic: true,
                performance: false,
                security: false,
            },
            intervals: Intervals {
                basic: 60,
                performance: 300,
                security: 3600,
            },
            notifications: NotificationToggles {
                status: true,
                performance: false,
                security: true,
            },
            thresholds: Thresholds {
                connections: 1000,
                error_rate: 5.0,
                response_time: 500,
            },
            exporters: Exporters {
                node: true,
                nginx: true,
                mysql: true,
                redis: false,
                php_fpm: false,
            },
        }
    }
}

impl MonitoringConfig {
    /// Merge a partial JSON document over the defaults.
    ///
    /// Top-level scalars replace the default; object sections are merged one
    /// level deep so a section may omit keys.
    pub fn merge_over_defaults(partial: &Value) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let Some(incoming) = partial.as_object() else {
            return Err(Error::invalid("Monitoring config must be a JSON object"));
        };

        if let Some(base) = merged.as_object_mut() {
            for (key, value) in incoming {
                match (base.get_mut(key), value) {
                    (Some(Value::Object(section)), Value::Object(overrides)) => {
                        for (k, v) in overrides {
                            section.insert(k.clone(), v.clone());
                        }
                    }
                    (Some(_), Value::Object(_)) | (Some(Value::Object(_)), _) => {
                        return Err(Error::invalid(format!(
                            "Monitoring config field '{}' has the wrong shape",
                            key
                        )));
                    }
                    _ => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        serde_json::from_value(merged)
            .map_err(|e| Error::invalid(format!("Invalid monitoring config: {}", e)))
    }

    /// Validate a replacement document and merge it over the defaults
    pub fn from_update(update: &Value) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_SECTIONS
            .iter()
            .copied()
            .filter(|s| !update.get(*s).map(Value::is_object).unwrap_or(false))
            .collect();

        if !missing.is_empty() {
            return Err(Error::invalid(format!(
                "Invalid configuration format: missing {}",
                missing.join(", ")
            )));
        }

        Self::merge_over_defaults(update)
    }

    /// Load from `path`, writing the defaults first if the file is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match fsutil::read_json::<Value>(path)? {
            Some(raw) => {
                debug!("Loaded monitoring config from {}", path.display());
                Self::merge_over_defaults(&raw)
            }
            None => {
                let config = Self::default();
                config.save(path)?;
                info!("Initialized monitoring config at {}", path.display());
                Ok(config)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fsutil::write_json(path, self)
    }

    /// Whether the service-status watcher should run at all
    pub fn watch_enabled(&self) -> bool {
        self.enabled && self.levels.basic
    }
}
