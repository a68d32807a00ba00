//! LEMP Manager Exec - runs external programs by argument vector
//!
//! Nothing here goes through a shell. Callers validate their inputs and pass
//! each value as its own argument; secrets travel through the environment.

pub mod command;
pub mod runner;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use command::{CommandOutput, CommandSpec};
pub use runner::{CommandRunner, SystemRunner};

#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedRunner;
