//! LEMP Manager Deploy - remote environment check and stack installation
//!
//! Each deployment gets its own workspace directory holding the SSH key, the
//! rendered inventory and the variables file. The work itself is done by the
//! pre-check and install scripts; nothing here tracks partial progress.

pub mod deployer;
pub mod render;
pub mod request;
pub mod workspace;

pub use deployer::Deployer;
pub use request::{AuthType, CheckRequest, CheckResult, Checks, InstallRequest, InstallResult};
pub use workspace::Workspace;
