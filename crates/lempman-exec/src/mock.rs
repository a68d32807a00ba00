//! Scripted runner for tests

use async_trait::async_trait;
use lempman_core::{Error, Result};
use parking_lot::Mutex;

use crate::command::{CommandOutput, CommandSpec};
use crate::runner::CommandRunner;

struct Rule {
    program: String,
    /// Leading arguments that must match; empty matches any invocation
    args_prefix: Vec<String>,
    response: Option<CommandOutput>,
}

/// A runner that answers from a script and records every call.
///
/// Rules are matched most-recently-added first. Unscripted programs fail as
/// if they were not installed.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any invocation of `program`
    pub fn on(self, program: &str, output: CommandOutput) -> Self {
        self.on_args(program, &[], output)
    }

    /// Answer invocations of `program` whose arguments start with `args`
    pub fn on_args(self, program: &str, args: &[&str], output: CommandOutput) -> Self {
        self.push(program, args, Some(output));
        self
    }

    /// Make `program` fail to spawn
    pub fn missing(self, program: &str) -> Self {
        self.push(program, &[], None);
        self
    }

    fn push(&self, program: &str, args: &[&str], response: Option<CommandOutput>) {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            args_prefix: args.iter().map(|a| a.to_string()).collect(),
            response,
        });
    }

    /// Every command run so far
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Commands run for `program`
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().push(spec.clone());

        let rules = self.rules.lock();
        let rule = rules.iter().rev().find(|r| {
            r.program == spec.program && spec.args.starts_with(&r.args_prefix)
        });

        match rule.and_then(|r| r.response.clone()) {
            Some(output) => Ok(output),
            None => Err(Error::CommandFailed(format!(
                "Failed to start '{}': not scripted",
                spec.program
            ))),
        }
    }

    fn available(&self, program: &str) -> bool {
        self.rules
            .lock()
            .iter()
            .any(|r| r.program == program && r.response.is_some())
    }
}
