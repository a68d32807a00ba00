//! Command implementations

pub mod notify;
pub mod serve;
pub mod status;
pub mod user;

use anyhow::{Context, Result};
use lempman_core::Settings;
use lempman_db::Database;
use std::path::Path;

/// Load settings from `--config` or the config directory
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    Settings::load(config).context("Failed to load settings")
}

/// Open the console database, creating the config directory if needed
pub async fn open_db(settings: &Settings) -> Result<Database> {
    std::fs::create_dir_all(&settings.config_dir).with_context(|| {
        format!("Failed to create {}", settings.config_dir.display())
    })?;
    Database::new(&settings.db_path())
        .await
        .context("Failed to open database")
}
