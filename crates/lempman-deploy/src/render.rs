//! Ansible inventory and variables rendering

use lempman_core::{Result, DEPLOY_COMPONENTS};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Inventory with a single `webservers` host.
/// Inputs are expected to be validated already.
pub fn inventory(host: &str, user: Option<&str>, key_file: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[webservers]");
    let _ = writeln!(out, "{}", host);
    let _ = writeln!(out);
    let _ = writeln!(out, "[webservers:vars]");
    if let Some(user) = user.filter(|u| !u.is_empty()) {
        let _ = writeln!(out, "ansible_user={}", user);
    }
    if let Some(key) = key_file {
        let _ = writeln!(out, "ansible_ssh_private_key_file={}", key.display());
    }
    let _ = writeln!(out, "ansible_python_interpreter=/usr/bin/python3");
    out
}

/// Variables file: `<component>_version` for every version given and
/// `<component>_enabled` for every known component
pub fn vars(components: &BTreeMap<String, bool>, versions: &BTreeMap<String, String>) -> Result<String> {
    let mut map = Mapping::new();

    for name in DEPLOY_COMPONENTS {
        if let Some(version) = versions.get(*name).filter(|v| !v.is_empty()) {
            map.insert(
                Value::String(format!("{}_version", name)),
                Value::String(version.clone()),
            );
        }
    }
    for name in DEPLOY_COMPONENTS {
        let enabled = components.get(*name).copied().unwrap_or(false);
        map.insert(
            Value::String(format!("{}_enabled", name)),
            Value::Bool(enabled),
        );
    }

    let body = serde_yaml::to_string(&map)?;
    Ok(format!("---\n{}", body))
}
