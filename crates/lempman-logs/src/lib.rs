//! LEMP Manager Logs - paged search over the central log index

pub mod client;
pub mod query;

pub use client::LogClient;
pub use query::{LogEntry, LogPage, LogQuery};
