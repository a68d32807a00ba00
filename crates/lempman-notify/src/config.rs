//! Telegram config singleton

use lempman_core::fsutil;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{NotifyError, Result};

/// Telegram settings, stored as plaintext JSON with owner-only permissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    pub enabled: bool,
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Chat ID to send messages to (user, group or channel)
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn new(enabled: bool, bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            enabled,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Load from `path`; a missing file yields the disabled default
    pub fn load(path: &Path) -> Result<Self> {
        match fsutil::read_json::<TelegramConfig>(path)? {
            Some(config) => {
                debug!("Loaded telegram config from {}", path.display());
                Ok(config)
            }
            None => {
                debug!("Telegram config not found at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        fsutil::write_json(path, self)?;
        info!("Saved telegram config to {}", path.display());
        Ok(())
    }

    /// Both credentials present
    pub fn is_complete(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    /// Ready to send
    pub fn is_active(&self) -> bool {
        self.enabled && self.is_complete()
    }

    /// An enabled config must carry both credentials
    pub fn validate(&self) -> Result<()> {
        if self.enabled && !self.is_complete() {
            return Err(NotifyError::config("Bot token and chat ID are required"));
        }
        Ok(())
    }
}
