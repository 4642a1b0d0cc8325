//! Command runner
//!
//! Runs one toolchain step, prints progress and diagnostics, and turns the
//! exit status into either a typed error or a pass/fail flag.

use crate::command::{CommandExecutor, CommandOutput, ToolCommand};
use crate::error::{BuildError, Result};
use crate::pipeline::Stage;

/// What a non-zero exit means for the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the build with `BuildError::Toolchain`.
    Fatal,
    /// Report `Ok(false)` and let the caller decide.
    Recoverable,
}

pub struct Runner<E> {
    executor: E,
}

impl<E: CommandExecutor> Runner<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Run `command` for `stage`.
    ///
    /// Returns `Ok(true)` on a zero exit. On failure the captured stderr is
    /// printed first, then either `Err` (fatal) or `Ok(false)` (recoverable).
    /// A command that cannot be spawned counts as a failure of its step.
    pub fn run(&mut self, stage: Stage, command: &ToolCommand, policy: FailurePolicy) -> Result<bool> {
        println!("\nRunning: {}", command);
        tracing::debug!(%stage, ?policy, "spawning {:?}", command.program());

        let output = match self.executor.execute(command) {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(%stage, "spawn failed: {}", err);
                CommandOutput::spawn_failure(command, &err)
            }
        };

        if output.is_success() {
            println!("Done");
            return Ok(true);
        }

        eprintln!("Error:");
        eprintln!("{}", output.stderr.trim_end());

        match policy {
            FailurePolicy::Fatal => Err(BuildError::Toolchain {
                stage,
                code: output.code,
                stderr: output.stderr,
            }),
            FailurePolicy::Recoverable => {
                tracing::warn!(%stage, code = ?output.code, "step failed, continuing");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    /// Replays a fixed response for every command.
    struct Canned(fn() -> io::Result<CommandOutput>);

    impl CommandExecutor for Canned {
        fn execute(&mut self, _command: &ToolCommand) -> io::Result<CommandOutput> {
            (self.0)()
        }
    }

    fn cmd() -> ToolCommand {
        ToolCommand::new("clang").arg("-O2")
    }

    #[test]
    fn test_success_is_true() {
        let mut runner = Runner::new(Canned(|| Ok(CommandOutput::success())));
        assert!(runner.run(Stage::Frontend, &cmd(), FailurePolicy::Fatal).unwrap());
    }

    #[test]
    fn test_fatal_failure_is_error() {
        let mut runner = Runner::new(Canned(|| Ok(CommandOutput::failure(1, "boom\n"))));
        let err = runner.run(Stage::Codegen, &cmd(), FailurePolicy::Fatal).unwrap_err();
        match err {
            BuildError::Toolchain { stage, code, stderr } => {
                assert_eq!(stage, Stage::Codegen);
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "boom\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_recoverable_failure_is_false() {
        let mut runner = Runner::new(Canned(|| Ok(CommandOutput::failure(2, "wasm-ld: error"))));
        let ok = runner
            .run(Stage::WasmPrimary, &cmd(), FailurePolicy::Recoverable)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_spawn_error_is_step_failure() {
        let mut runner = Runner::new(Canned(|| {
            Err(io::Error::new(io::ErrorKind::NotFound, "not found"))
        }));
        assert!(!runner
            .run(Stage::WasmPrimary, &cmd(), FailurePolicy::Recoverable)
            .unwrap());

        let err = runner.run(Stage::Frontend, &cmd(), FailurePolicy::Fatal).unwrap_err();
        assert!(matches!(err, BuildError::Toolchain { code: None, .. }));
    }
}
