//! Serializable status reports

use lempman_core::ServiceState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capacity figures in bytes plus the used share in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage: f64,
}

impl Usage {
    pub fn new(total: u64, used: u64, free: u64) -> Self {
        let usage = if total == 0 {
            0.0
        } else {
            used as f64 * 100.0 / total as f64
        };
        Self {
            total,
            used,
            free,
            usage,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    pub usage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub enabled: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orders {
    pub today: u64,
}

/// Storefront figures for one Magento install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagentoStatus {
    pub mode: String,
    pub cache_status: CacheStatus,
    pub orders: Orders,
    pub active_users: u64,
}

impl Default for MagentoStatus {
    fn default() -> Self {
        Self {
            mode: "unknown".to_string(),
            cache_status: CacheStatus::default(),
            orders: Orders::default(),
            active_users: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStatus {
    pub name: String,
    pub path: String,
    pub status: MagentoStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceStatus {
    pub fn of(state: ServiceState) -> Self {
        Self {
            status: state,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ServiceState::Error,
            error: Some(message.into()),
        }
    }
}

/// Host overview shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub uptime: String,
    pub cpu: Cpu,
    pub memory: Usage,
    pub disk: Usage,
    /// Keyed by site id
    pub sites: BTreeMap<String, SiteStatus>,
    /// Keyed by service name
    pub services: BTreeMap<String, ServiceStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NginxConnections {
    pub active: u64,
    pub reading: u64,
    pub writing: u64,
    pub waiting: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NginxRequests {
    pub total: u64,
    pub per_second: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NginxWorkers {
    pub total: u64,
    pub busy: u64,
    pub idle: u64,
}

impl NginxWorkers {
    /// Busy workers are approximated by active connections, capped at the pool size
    pub fn from_counts(total: u64, active_connections: u64) -> Self {
        let busy = active_connections.min(total);
        Self {
            total,
            busy,
            idle: total - busy,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NginxStatus {
    pub is_running: bool,
    pub connections: NginxConnections,
    pub requests: NginxRequests,
    pub workers: NginxWorkers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub status: ServiceState,
}

/// Status of a service without a dedicated probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericServiceStatus {
    pub is_running: bool,
    pub metrics: ServiceMetrics,
}

/// Reachability of an HTTP endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EndpointStatus {
    pub fn up() -> Self {
        Self {
            running: true,
            error: None,
        }
    }

    pub fn down() -> Self {
        Self {
            running: false,
            error: Some("Service not accessible".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStackStatus {
    pub prometheus: EndpointStatus,
    pub alertmanager: EndpointStatus,
    pub grafana: EndpointStatus,
}
