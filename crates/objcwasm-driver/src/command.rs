//! External command description and execution.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::process::{Command, Output, Stdio};

use serde::{Serialize, Serializer};

/// A program plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Program followed by arguments, lossily converted for display.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    /// Value of the argument following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

impl Serialize for ToolCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.argv().serialize(serializer)
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal or never started
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Stand-in output for a command that could not be spawned at all.
    pub fn spawn_failure(command: &ToolCommand, err: &io::Error) -> Self {
        Self {
            code: None,
            stdout: String::new(),
            stderr: format!("failed to start {}: {}", command.program().to_string_lossy(), err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs external commands to completion.
///
/// The pipeline only ever talks to the toolchain through this trait, so tests
/// can script success and failure without real compilers.
pub trait CommandExecutor {
    /// Run `command`, blocking until it exits. `Err` means it could not be started.
    fn execute(&mut self, command: &ToolCommand) -> io::Result<CommandOutput>;
}

/// Spawns real child processes with captured stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&mut self, command: &ToolCommand) -> io::Result<CommandOutput> {
        let output = Command::new(command.program())
            .args(command.get_args())
            .stdin(Stdio::null())
            .output()?;
        Ok(output.into())
    }
}
