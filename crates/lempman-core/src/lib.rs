//! LEMP Manager Core - Shared types, settings, and error handling

pub mod constants;
pub mod error;
pub mod fsutil;
pub mod monitoring;
pub mod settings;
pub mod types;

pub use constants::*;
pub use error::{Error, Result};
pub use monitoring::MonitoringConfig;
pub use settings::Settings;
pub use types::*;
