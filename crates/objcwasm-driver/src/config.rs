//! Driver configuration
//!
//! Toolchain locations, output directory and fallback container settings.
//! Defaults match a Homebrew LLVM install with a WASI sysroot under `/opt`;
//! a JSON config file may override any subset of fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

pub const DEFAULT_LLVM_BIN: &str = "/usr/local/opt/llvm/bin";
pub const DEFAULT_WASI_SYSROOT: &str = "/opt/wasi-sysroot";
pub const DEFAULT_OUTPUT_DIR: &str = "./build";
pub const DEFAULT_FALLBACK_IMAGE: &str = "ghcr.io/webassembly/wasi-sdk:latest";

/// Settings for the whole pipeline, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Directory containing `clang` and `llc`
    pub llvm_bin: PathBuf,
    /// Sysroot passed to the host wasm compile
    pub wasi_sysroot: PathBuf,
    /// Where `.ll`, `.o` and `.wasm` artifacts are written
    pub output_dir: PathBuf,
    pub fallback: FallbackConfig,
}

/// Containerized wasi-sdk used when the host wasm compile fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub enabled: bool,
    /// Container runtime executable (`docker`, `podman`, ...)
    pub runtime: String,
    pub image: String,
    /// Compiler path inside the image
    pub clang: String,
    /// Where the working directory is mounted inside the container
    pub mount_point: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            llvm_bin: PathBuf::from(DEFAULT_LLVM_BIN),
            wasi_sysroot: PathBuf::from(DEFAULT_WASI_SYSROOT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            fallback: FallbackConfig::default(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            runtime: "docker".to_string(),
            image: DEFAULT_FALLBACK_IMAGE.to_string(),
            clang: "/wasi-sdk/bin/clang".to_string(),
            mount_point: "/src".to_string(),
        }
    }
}

impl DriverConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BuildError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| BuildError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn llvm_bin(mut self, dir: impl Into<PathBuf>) -> Self {
        self.llvm_bin = dir.into();
        self
    }

    pub fn wasi_sysroot(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wasi_sysroot = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn fallback_image(mut self, image: impl Into<String>) -> Self {
        self.fallback.image = image.into();
        self
    }

    pub fn container_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.fallback.runtime = runtime.into();
        self
    }

    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback.enabled = enabled;
        self
    }

    /// Host `clang`, used for both the frontend and the primary wasm step
    pub fn clang(&self) -> PathBuf {
        self.llvm_bin.join("clang")
    }

    pub fn llc(&self) -> PathBuf {
        self.llvm_bin.join("llc")
    }
}
