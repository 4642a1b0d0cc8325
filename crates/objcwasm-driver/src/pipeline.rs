//! Build pipeline
//!
//! Sequences the toolchain steps for one source file:
//!
//! 1. Frontend: `clang -S -emit-llvm` produces `<stem>.ll`
//! 2. Codegen: `llc -filetype=obj` produces `<stem>.o`
//! 3. Wasm: host `clang --target=wasm32-unknown-wasi` produces `<stem>.wasm`
//! 4. Fallback: the same compile inside a wasi-sdk container, only if step 3 fails
//!
//! Steps 1, 2 and 4 are fatal on failure. Step 3 is recoverable unless the
//! fallback is disabled.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::artifacts::BuildArtifacts;
use crate::command::{CommandExecutor, SystemExecutor, ToolCommand};
use crate::config::DriverConfig;
use crate::error::{BuildError, Result};
use crate::runner::{FailurePolicy, Runner};

/// One external command invocation in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Frontend,
    Codegen,
    WasmPrimary,
    WasmFallback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Frontend => "frontend compile",
            Stage::Codegen => "codegen",
            Stage::WasmPrimary => "wasm compile",
            Stage::WasmFallback => "container fallback",
        };
        f.write_str(name)
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub artifacts: BuildArtifacts,
    /// The wasm module came from the container rather than the host compiler
    pub used_fallback: bool,
}

/// The commands a build would run, without running them.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub artifacts: BuildArtifacts,
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub stage: Stage,
    pub command: ToolCommand,
}

pub struct Pipeline<E = SystemExecutor> {
    config: DriverConfig,
    /// Mounted into the fallback container; the process cwd when unset
    work_dir: Option<PathBuf>,
    runner: Runner<E>,
}

impl Pipeline<SystemExecutor> {
    pub fn new(config: DriverConfig) -> Self {
        Self::with_executor(config, SystemExecutor)
    }
}

impl<E: CommandExecutor> Pipeline<E> {
    pub fn with_executor(config: DriverConfig, executor: E) -> Self {
        Self {
            config,
            work_dir: None,
            runner: Runner::new(executor),
        }
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        self.runner.executor()
    }

    /// Run every step for `source`, stopping at the first fatal failure.
    pub fn build(&mut self, source: impl AsRef<Path>) -> Result<BuildOutput> {
        let artifacts = self.prepare(source.as_ref())?;

        fs::create_dir_all(&self.config.output_dir).map_err(|source| BuildError::OutputDir {
            path: self.config.output_dir.clone(),
            source,
        })?;

        self.runner.run(
            Stage::Frontend,
            &frontend_command(&self.config, &artifacts),
            FailurePolicy::Fatal,
        )?;
        self.runner.run(
            Stage::Codegen,
            &codegen_command(&self.config, &artifacts),
            FailurePolicy::Fatal,
        )?;

        remove_stale(&artifacts.wasm)?;

        let policy = if self.config.fallback.enabled {
            FailurePolicy::Recoverable
        } else {
            FailurePolicy::Fatal
        };
        let primary_ok = self.runner.run(
            Stage::WasmPrimary,
            &wasm_command(&self.config, &artifacts),
            policy,
        )?;

        if primary_ok {
            return Ok(BuildOutput {
                artifacts,
                used_fallback: false,
            });
        }

        println!(
            "\nHost clang failed, falling back to container image {}",
            self.config.fallback.image
        );
        let work_dir = self.resolve_work_dir()?;
        self.runner.run(
            Stage::WasmFallback,
            &fallback_command(&self.config, &artifacts, &work_dir),
            FailurePolicy::Fatal,
        )?;

        Ok(BuildOutput {
            artifacts,
            used_fallback: true,
        })
    }

    /// Compute the commands `build` would run, in order. Nothing is created
    /// or spawned.
    pub fn plan(&self, source: impl AsRef<Path>) -> Result<BuildPlan> {
        let artifacts = self.prepare(source.as_ref())?;

        let mut steps = vec![
            PlannedStep {
                stage: Stage::Frontend,
                command: frontend_command(&self.config, &artifacts),
            },
            PlannedStep {
                stage: Stage::Codegen,
                command: codegen_command(&self.config, &artifacts),
            },
            PlannedStep {
                stage: Stage::WasmPrimary,
                command: wasm_command(&self.config, &artifacts),
            },
        ];
        if self.config.fallback.enabled {
            let work_dir = self.resolve_work_dir()?;
            steps.push(PlannedStep {
                stage: Stage::WasmFallback,
                command: fallback_command(&self.config, &artifacts, &work_dir),
            });
        }

        Ok(BuildPlan { artifacts, steps })
    }

    fn prepare(&self, source: &Path) -> Result<BuildArtifacts> {
        if !source.exists() {
            return Err(BuildError::InputNotFound(source.to_path_buf()));
        }
        let artifacts = BuildArtifacts::new(source, &self.config.output_dir)?;
        tracing::debug!(?artifacts, "derived artifact paths");
        Ok(artifacts)
    }

    fn resolve_work_dir(&self) -> Result<PathBuf> {
        match &self.work_dir {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir().map_err(BuildError::WorkDir),
        }
    }
}

/// Delete a wasm module left over from an earlier run so a failed build
/// cannot leave it behind.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::StaleArtifact {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn frontend_command(config: &DriverConfig, artifacts: &BuildArtifacts) -> ToolCommand {
    ToolCommand::new(config.clang())
        .args(["-S", "-emit-llvm"])
        .arg(&artifacts.source)
        .arg("-o")
        .arg(&artifacts.ir)
        .args(["-fobjc-arc", "-framework", "Foundation"])
}

pub fn codegen_command(config: &DriverConfig, artifacts: &BuildArtifacts) -> ToolCommand {
    ToolCommand::new(config.llc())
        .arg(&artifacts.ir)
        .arg("-filetype=obj")
        .arg("-o")
        .arg(&artifacts.object)
}

pub fn wasm_command(config: &DriverConfig, artifacts: &BuildArtifacts) -> ToolCommand {
    let mut sysroot = OsString::from("--sysroot=");
    sysroot.push(&config.wasi_sysroot);

    ToolCommand::new(config.clang())
        .arg("--target=wasm32-unknown-wasi")
        .arg(sysroot)
        .args(["-O2", "-s", "-o"])
        .arg(&artifacts.wasm)
        .arg(&artifacts.object)
}

pub fn fallback_command(
    config: &DriverConfig,
    artifacts: &BuildArtifacts,
    work_dir: &Path,
) -> ToolCommand {
    let fallback = &config.fallback;

    let mut volume = work_dir.as_os_str().to_os_string();
    volume.push(":");
    volume.push(&fallback.mount_point);

    let mount_point = Path::new(&fallback.mount_point);
    ToolCommand::new(&fallback.runtime)
        .args(["run", "--rm", "-v"])
        .arg(volume)
        .arg("-w")
        .arg(&fallback.mount_point)
        .arg(&fallback.image)
        .arg(&fallback.clang)
        .args(["--target=wasm32-wasi", "-O2", "-o"])
        .arg(container_path(&artifacts.wasm, work_dir, mount_point))
        .arg(container_path(&artifacts.object, work_dir, mount_point))
}

/// Where `path` is visible inside the container.
///
/// Relative paths resolve against the mounted working directory unchanged.
/// Absolute paths outside the working directory are not mounted at all.
fn container_path(path: &Path, work_dir: &Path, mount_point: &Path) -> PathBuf {
    if path.is_relative() {
        return path.to_path_buf();
    }
    match path.strip_prefix(work_dir) {
        Ok(rel) => mount_point.join(rel),
        Err(_) => {
            tracing::warn!(
                "{} is outside {} and will not be visible to the container",
                path.display(),
                work_dir.display()
            );
            path.to_path_buf()
        }
    }
}
