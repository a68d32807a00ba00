//! LEMP Manager Health
//!
//! Host figures come from external tools run through a [`CommandRunner`];
//! the monitoring stack and nginx `stub_status` are checked over HTTP.
//!
//! [`CommandRunner`]: lempman_exec::CommandRunner

pub mod endpoint;
pub mod nginx;
pub mod parse;
pub mod probe;
pub mod report;

pub use endpoint::EndpointChecker;
pub use nginx::{NginxProbe, RateSampler};
pub use probe::SystemProbe;
pub use report::*;
