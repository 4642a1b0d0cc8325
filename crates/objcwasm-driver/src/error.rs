//! Error types for the build driver.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that stop a build.
///
/// A recoverable failure of the primary wasm step never surfaces here; it is
/// reported by the runner as `Ok(false)` and the pipeline falls back instead.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The source file does not exist on disk.
    #[error("file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The source path has no file stem to name the artifacts after.
    #[error("cannot derive an output name from {}", .0.display())]
    InvalidSource(PathBuf),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove stale artifact {}: {source}", path.display())]
    StaleArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The working directory to mount into the fallback container is unavailable.
    #[error("failed to resolve working directory: {0}")]
    WorkDir(#[source] io::Error),

    /// An external command exited unsuccessfully on a fatal step.
    #[error("{stage} step failed ({})", exit_description(.code))]
    Toolchain {
        stage: Stage,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    /// Process exit status the CLI should use for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "did not exit normally".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_error_message() {
        let err = BuildError::Toolchain {
            stage: Stage::Codegen,
            code: Some(3),
            stderr: "llc: bad input".to_string(),
        };
        assert_eq!(err.to_string(), "codegen step failed (exit code 3)");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_toolchain_error_without_code() {
        let err = BuildError::Toolchain {
            stage: Stage::WasmFallback,
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "container fallback step failed (did not exit normally)");
    }

    #[test]
    fn test_input_not_found_message() {
        let err = BuildError::InputNotFound(PathBuf::from("missing.m"));
        assert_eq!(err.to_string(), "file not found: missing.m");
        assert_eq!(err.exit_code(), 1);
    }
}
