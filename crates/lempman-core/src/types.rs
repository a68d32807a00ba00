//! Core types for LEMP Manager

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use crate::error::{Error, Result};

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").expect("Invalid username regex"));

static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9.-]{0,252}[A-Za-z0-9])?$").expect("Invalid hostname regex")
});

static IPV6_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f:]{2,39}$").expect("Invalid ipv6 regex"));

static SERVICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9@._-]{0,127}$").expect("Invalid service name regex")
});

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,31}$").expect("Invalid version regex")
});

static SSH_USER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("Invalid ssh user regex"));

/// Validate a console username
pub fn validate_username(name: &str) -> bool {
    USERNAME_REGEX.is_match(name)
}

/// Validate a target host (DNS name, IPv4 or IPv6 literal).
/// A leading `-` is rejected so the value can never be read as an option.
pub fn validate_host(host: &str) -> bool {
    HOSTNAME_REGEX.is_match(host) || (host.contains(':') && IPV6_REGEX.is_match(host))
}

/// Validate a systemd unit name
pub fn validate_service_name(name: &str) -> bool {
    SERVICE_REGEX.is_match(name)
}

/// Validate a component version string
pub fn validate_version(version: &str) -> bool {
    VERSION_REGEX.is_match(version)
}

/// Validate a remote SSH login name
pub fn validate_ssh_user(user: &str) -> bool {
    SSH_USER_REGEX.is_match(user)
}

/// Validate a site installation path: absolute and free of `..`
pub fn validate_site_path(path: &str) -> bool {
    let p = Path::new(path);
    !path.contains('\0')
        && p.is_absolute()
        && !p.components().any(|c| matches!(c, Component::ParentDir))
}

/// Console user role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(Error::invalid(format!("Unknown role: {}", s))),
        }
    }
}

/// A console user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    /// bcrypt hash; never leaves the server
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            role,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A hosted Magento site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    pub path: String,
    pub enabled: bool,
    #[serde(default)]
    pub frontend_url: String,
    #[serde(default)]
    pub admin_url: String,
}

/// Site create/update payload. Every field is optional so one shape serves
/// both the "create" and the "update" form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub enabled: Option<bool>,
    pub frontend_url: Option<String>,
    pub admin_url: Option<String>,
}

impl SiteInput {
    /// Check required fields and the path shape
    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_deref().unwrap_or("").trim();
        let path = self.path.as_deref().unwrap_or("").trim();

        if name.is_empty() || path.is_empty() {
            return Err(Error::invalid("Name and path are required"));
        }
        if !validate_site_path(path) {
            return Err(Error::invalid(format!(
                "Site path must be absolute without '..': {}",
                path
            )));
        }
        Ok(())
    }

    /// Build a brand new site; new sites start enabled
    pub fn into_new_site(self, id: String) -> Site {
        Site {
            id,
            name: self.name.unwrap_or_default().trim().to_string(),
            path: self.path.unwrap_or_default().trim().to_string(),
            enabled: self.enabled.unwrap_or(true),
            frontend_url: self.frontend_url.unwrap_or_default(),
            admin_url: self.admin_url.unwrap_or_default(),
        }
    }

    /// Merge into an existing site. Empty URLs keep the stored ones.
    pub fn apply_to(self, existing: &Site) -> Site {
        let keep = |new: Option<String>, old: &str| match new {
            Some(v) if !v.is_empty() => v,
            _ => old.to_string(),
        };

        Site {
            id: existing.id.clone(),
            name: self
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| existing.name.clone()),
            path: self
                .path
                .map(|p| p.trim().to_string())
                .unwrap_or_else(|| existing.path.clone()),
            enabled: self.enabled.unwrap_or(existing.enabled),
            frontend_url: keep(self.frontend_url, &existing.frontend_url),
            admin_url: keep(self.admin_url, &existing.admin_url),
        }
    }
}

/// Observed state of a system service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
    Error,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::Error => "error",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, ServiceState::Running)
    }

    /// Edge-triggered transition between two observations.
    ///
    /// Only up/down flips count; `stopped` and `error` are both "down". A
    /// service first seen down is reported, one first seen up is not.
    pub fn transition(previous: Option<ServiceState>, next: ServiceState) -> Option<Transition> {
        match (previous.map(|p| p.is_up()), next.is_up()) {
            (None, false) | (Some(true), false) => Some(Transition::Down),
            (Some(false), true) => Some(Transition::Recovered),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(ServiceState::Running),
            "stopped" => Ok(ServiceState::Stopped),
            "error" => Ok(ServiceState::Error),
            _ => Err(Error::invalid(format!("Unknown service state: {}", s))),
        }
    }
}

/// A state change worth notifying about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down,
    Recovered,
}

/// Last persisted observation of a service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    pub service: String,
    pub state: ServiceState,
    pub changed_at: DateTime<Utc>,
    pub checked_at: DateTime<Utc>,
}
