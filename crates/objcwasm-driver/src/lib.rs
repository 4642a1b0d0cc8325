//! objcwasm build driver
//!
//! Turns a single Objective-C source file into a WASI WebAssembly binary by
//! shelling out to LLVM (`clang`, `llc`), with a containerized wasi-sdk
//! fallback when the host wasm compile fails.

pub mod artifacts;
pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runner;

pub use artifacts::BuildArtifacts;
pub use command::{CommandExecutor, CommandOutput, SystemExecutor, ToolCommand};
pub use config::{DriverConfig, FallbackConfig};
pub use error::{BuildError, Result};
pub use pipeline::{BuildOutput, BuildPlan, Pipeline, PlannedStep, Stage};
pub use runner::{FailurePolicy, Runner};
