//! Scripted runner for tests.

use crate::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
use std::path::Path;
use std::sync::Mutex;

struct Rule {
    program: String,
    args_prefix: Vec<String>,
    response: Result<ProcessOutput, (Option<i32>, String)>,
}

/// A [`ProcessRunner`] that answers from a rule table and records every call.
///
/// Rules are matched in insertion order on program name and argument prefix.
/// Unmatched commands fail as if the binary did not exist.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching commands with `stdout`.
    pub fn on(&self, program: &str, args_prefix: &[&str], stdout: impl Into<String>) -> &Self {
        self.push(program, args_prefix, Ok(ProcessOutput::stdout(stdout)));
        self
    }

    /// Fail matching commands with a non-zero exit.
    pub fn fail(&self, program: &str, args_prefix: &[&str], stderr: impl Into<String>) -> &Self {
        self.push(program, args_prefix, Err((Some(1), stderr.into())));
        self
    }

    fn push(
        &self,
        program: &str,
        args_prefix: &[&str],
        response: Result<ProcessOutput, (Option<i32>, String)>,
    ) {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            args_prefix: args_prefix.iter().map(|s| s.to_string()).collect(),
            response,
        });
    }

    /// Every command seen so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands seen for one program.
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    fn respond(&self, cmd: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(cmd.clone());
        let rules = self.rules.lock().unwrap();
        let rule = rules
            .iter()
            .find(|r| r.program == cmd.program && cmd.args.starts_with(&r.args_prefix));
        match rule {
            Some(Rule {
                response: Ok(out), ..
            }) => Ok(out.clone()),
            Some(Rule {
                response: Err((code, stderr)),
                ..
            }) => Err(ProcessError::NonZeroExit {
                program: cmd.program.clone(),
                code: *code,
                stderr: stderr.clone(),
            }),
            None => Err(ProcessError::Spawn {
                program: cmd.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no scripted response"),
            }),
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        self.respond(cmd)
    }

    fn spawn_detached(&self, cmd: &CommandSpec, _log_file: &Path) -> Result<u32, ProcessError> {
        self.calls.lock().unwrap().push(cmd.clone());
        Ok(4242)
    }
}
