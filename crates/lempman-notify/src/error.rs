//! Error types for the notification system

/// Notification error type
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    HttpError(reqwest::Error),

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Config storage error: {0}")]
    Storage(#[from] lempman_core::Error),

    #[error("Telegram notifications are not enabled or not fully configured")]
    NotConfigured,
}

// Bot API URLs carry the token, so it never reaches a message or a log line
impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::HttpError(e.without_url())
    }
}

/// Result type alias for notification operations
pub type Result<T> = std::result::Result<T, NotifyError>;

impl NotifyError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        NotifyError::ConfigError(msg.into())
    }

    pub fn telegram<S: Into<String>>(msg: S) -> Self {
        NotifyError::TelegramError(msg.into())
    }

    /// Whether the failure happened at the remote API rather than locally
    pub fn is_upstream(&self) -> bool {
        matches!(self, NotifyError::HttpError(_) | NotifyError::TelegramError(_))
    }
}
