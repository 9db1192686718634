//! Subprocess execution for the external binaries roller drives.
//!
//! Every DA light node, key tool and chain binary is invoked through the
//! [`ProcessRunner`] trait so callers can swap the real runner for a scripted
//! one in tests. Calls are synchronous and have no built-in timeout; a hung
//! binary blocks the caller.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

/// Errors that can occur when running a subprocess.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with status code {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A program plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy().into_owned();
        self.arg(path)
    }

    /// Build the std command.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Output with the given stdout and empty stderr.
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Executes external binaries.
///
/// A non-zero exit status is always reported as [`ProcessError::NonZeroExit`].
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture stdout/stderr.
    fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, ProcessError>;

    /// Launch a long-running process and return its pid without waiting.
    ///
    /// The child is not supervised; its stdout and stderr are appended to
    /// `log_file`.
    fn spawn_detached(&self, cmd: &CommandSpec, log_file: &Path) -> Result<u32, ProcessError>;
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        debug!("[Execute]: {}", cmd);
        let output = cmd
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ProcessError::NonZeroExit {
                program: cmd.program.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        debug!("stdout: {}", stdout);
        Ok(ProcessOutput { stdout, stderr })
    }

    fn spawn_detached(&self, cmd: &CommandSpec, log_file: &Path) -> Result<u32, ProcessError> {
        debug!("[Spawn]: {} (logs: {})", cmd, log_file.display());
        let open_log = || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .map_err(|source| ProcessError::LogFile {
                    path: log_file.to_path_buf(),
                    source,
                })
        };
        let stdout = open_log()?;
        let stderr = open_log()?;

        let child = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        Ok(child.id())
    }
}
