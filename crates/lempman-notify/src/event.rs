//! Service events for notifications

use serde::{Deserialize, Serialize};

/// Events that can trigger notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceEvent {
    /// A service went down (or was first seen down)
    Down { service: String, state: String },

    /// A down service is running again
    Recovered { service: String },

    /// Operator-triggered test message
    Test { nginx_state: String },
}

impl ServiceEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ServiceEvent::Down { .. } => "down",
            ServiceEvent::Recovered { .. } => "recovered",
            ServiceEvent::Test { .. } => "test",
        }
    }

    /// Human-readable message with emoji
    pub fn format_message(&self) -> String {
        match self {
            ServiceEvent::Down { service, state } => {
                format!("\u{1F534} Service down: `{}` (state: {})", service, state)
            }
            ServiceEvent::Recovered { service } => {
                format!("\u{1F7E2} Service recovered: `{}` is running again", service)
            }
            ServiceEvent::Test { nginx_state } => {
                format!(
                    "\u{1F514} Test message from LEMP Manager\n\nNginx status: {}",
                    nginx_state
                )
            }
        }
    }
}
