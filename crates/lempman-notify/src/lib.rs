//! LEMP Manager Notification System
//!
//! Service transitions and operator test messages are delivered through
//! Telegram. The Telegram settings live in a JSON singleton that is re-read
//! on every send, so changes made through the API apply immediately.

pub mod config;
mod error;
mod event;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod telegram;

pub use config::TelegramConfig;
pub use error::{NotifyError, Result};
pub use event::ServiceEvent;
pub use telegram::TelegramNotifier;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockNotifier;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Trait for notification backends
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain text message
    async fn send(&self, message: &str) -> Result<()>;

    /// Send a formatted service event
    async fn send_event(&self, event: &ServiceEvent) -> Result<()> {
        self.send(&event.format_message()).await
    }

    /// Check if the notifier is configured and ready
    fn is_configured(&self) -> bool;
}

/// Delivers events according to the stored Telegram config
pub struct NotificationManager {
    config_path: PathBuf,
    api_base: Option<String>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotificationManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            api_base: None,
            notifier: None,
        }
    }

    /// Deliver through `notifier` instead of Telegram; the stored config
    /// still decides whether anything is sent
    pub fn with_notifier(config_path: impl Into<PathBuf>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config_path: config_path.into(),
            api_base: None,
            notifier: Some(notifier),
        }
    }

    /// Use a different Bot API server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn config(&self) -> Result<TelegramConfig> {
        TelegramConfig::load(&self.config_path)
    }

    /// Validate and persist a replacement config
    pub fn save_config(&self, config: &TelegramConfig) -> Result<()> {
        config.save(&self.config_path)
    }

    fn notifier_for(&self, config: &TelegramConfig) -> Arc<dyn Notifier> {
        if let Some(notifier) = &self.notifier {
            return notifier.clone();
        }

        let telegram = TelegramNotifier::new(config.bot_token.clone(), config.chat_id.clone());
        match &self.api_base {
            Some(base) => Arc::new(telegram.with_api_base(base.clone())),
            None => Arc::new(telegram),
        }
    }

    /// Send an event if notifications are enabled and complete.
    /// Returns whether a message was sent.
    pub async fn notify(&self, event: &ServiceEvent) -> Result<bool> {
        let config = self.config()?;
        if !config.is_active() {
            debug!("Telegram inactive, skipping {} event", event.event_type());
            return Ok(false);
        }

        self.notifier_for(&config).send_event(event).await?;
        Ok(true)
    }

    /// Send an operator test message; fails when Telegram is not ready
    pub async fn send_test(&self, event: &ServiceEvent) -> Result<()> {
        let config = self.config()?;
        if !config.is_active() {
            return Err(NotifyError::NotConfigured);
        }

        self.notifier_for(&config).send_event(event).await
    }
}
