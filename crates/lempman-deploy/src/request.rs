//! Deployment request and result types

use lempman_core::{validate_host, validate_ssh_user, validate_version, Error, Result, DEPLOY_COMPONENTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Password,
    Key,
}

/// Step one: can we reach and use the target host?
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub host: String,
    pub auth_type: AuthType,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssh_key: Option<String>,
}

fn validate_target(host: &str, user: Option<&str>) -> Result<()> {
    if !validate_host(host) {
        return Err(Error::invalid(format!("Invalid host: {}", host)));
    }
    if let Some(user) = user.filter(|u| !u.is_empty()) {
        if !validate_ssh_user(user) {
            return Err(Error::invalid(format!("Invalid SSH user: {}", user)));
        }
    }
    Ok(())
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl CheckRequest {
    pub fn validate(&self) -> Result<()> {
        validate_target(&self.host, self.user.as_deref())?;

        match self.auth_type {
            AuthType::Password if !present(&self.password) => {
                Err(Error::invalid("Password is required for password authentication"))
            }
            AuthType::Key if !present(&self.ssh_key) => {
                Err(Error::invalid("SSH key is required for key authentication"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checks {
    pub os: bool,
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
    pub network: bool,
}

impl Checks {
    /// The pre-check script reports a single verdict
    pub fn all(passed: bool) -> Self {
        Self {
            os: passed,
            cpu: passed,
            memory: passed,
            disk: passed,
            network: passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub deployment_id: String,
    pub success: bool,
    pub output: String,
    pub error: String,
    pub checks: Checks,
}

/// Step two: install the selected components
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    #[serde(default)]
    pub deployment_id: Option<String>,
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, bool>,
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

impl InstallRequest {
    pub fn validate(&self) -> Result<()> {
        validate_target(&self.host, self.user.as_deref())?;

        for name in self.components.keys().chain(self.versions.keys()) {
            if !DEPLOY_COMPONENTS.contains(&name.as_str()) {
                return Err(Error::invalid(format!("Unknown component: {}", name)));
            }
        }
        for (name, version) in &self.versions {
            if !version.is_empty() && !validate_version(version) {
                return Err(Error::invalid(format!("Invalid version for {}: {}", name, version)));
            }
        }
        if !self.components.values().any(|enabled| *enabled) {
            return Err(Error::invalid("Select at least one component"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    pub deployment_id: String,
    pub success: bool,
    pub output: String,
    pub error: String,
}
