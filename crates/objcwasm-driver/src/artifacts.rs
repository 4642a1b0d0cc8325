//! Artifact paths derived from the source file name.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{BuildError, Result};

/// Every file a build reads or writes.
///
/// Derived outputs are always `<output_dir>/<stem>.<ext>`; two sources with the
/// same stem overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifacts {
    pub source: PathBuf,
    /// LLVM IR text (`.ll`)
    pub ir: PathBuf,
    /// Native object (`.o`)
    pub object: PathBuf,
    /// Final WebAssembly module (`.wasm`)
    pub wasm: PathBuf,
}

impl BuildArtifacts {
    pub fn new(source: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref();
        let output_dir = output_dir.as_ref();
        let stem = source
            .file_stem()
            .ok_or_else(|| BuildError::InvalidSource(source.to_path_buf()))?;

        // Not `with_extension`: a stem like `app.main` must keep its dot.
        let derive = |ext: &str| {
            let mut name = stem.to_os_string();
            name.push(".");
            name.push(ext);
            output_dir.join(name)
        };

        Ok(Self {
            source: source.to_path_buf(),
            ir: derive("ll"),
            object: derive("o"),
            wasm: derive("wasm"),
        })
    }

    /// The three generated files, in the order they are produced.
    pub fn outputs(&self) -> [&Path; 3] {
        [self.ir.as_path(), self.object.as_path(), self.wasm.as_path()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let artifacts = BuildArtifacts::new("src/hello.m", "build").unwrap();
        assert_eq!(artifacts.source, PathBuf::from("src/hello.m"));
        assert_eq!(artifacts.ir, PathBuf::from("build/hello.ll"));
        assert_eq!(artifacts.object, PathBuf::from("build/hello.o"));
        assert_eq!(artifacts.wasm, PathBuf::from("build/hello.wasm"));
    }

    #[test]
    fn test_only_last_extension_replaced() {
        let artifacts = BuildArtifacts::new("app.main.m", "out").unwrap();
        assert_eq!(artifacts.ir, PathBuf::from("out/app.main.ll"));
        assert_eq!(artifacts.wasm, PathBuf::from("out/app.main.wasm"));
    }

    #[test]
    fn test_source_without_extension() {
        let artifacts = BuildArtifacts::new("hello", "./build").unwrap();
        assert_eq!(artifacts.object, PathBuf::from("./build/hello.o"));
    }

    #[test]
    fn test_source_without_stem() {
        let result = BuildArtifacts::new("..", "build");
        assert!(matches!(result, Err(BuildError::InvalidSource(_))));
    }

    #[test]
    fn test_outputs_order() {
        let artifacts = BuildArtifacts::new("hello.m", "build").unwrap();
        let names: Vec<_> = artifacts
            .outputs()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["hello.ll", "hello.o", "hello.wasm"]);
    }
}
