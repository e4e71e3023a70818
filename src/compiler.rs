//! External ahead-of-time compiler invocation
//!
//! One invocation per module with a fixed flag set. The compiler's internals
//! (including its own worker threads) are opaque here; only the exit status
//! and stderr are observed.

use crate::error::{BuildError, BuildResult};
use crate::registry::ModuleDescriptor;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Outcome of one compile attempt
#[derive(Debug)]
pub struct BuildOutcome {
    /// Module that was compiled
    pub module: String,
    /// Whether the external compiler exited zero
    pub success: bool,
    /// Compiler diagnostic output, captured verbatim
    pub diagnostic: String,
}

/// Narrow seam over the external ahead-of-time compiler, so the pipeline's
/// tests can substitute a deterministic fake.
pub trait AotCompiler {
    /// Compile one module into `output_dir`.
    ///
    /// A compiler that ran but exited non-zero is a `success = false`
    /// outcome; failing to run the compiler at all is an `Err`.
    fn compile(&self, module: &ModuleDescriptor, output_dir: &Path) -> BuildResult<BuildOutcome>;
}

/// Nuitka-backed compiler: `python -m nuitka --module`
pub struct Nuitka {
    python: String,
}

impl Nuitka {
    /// Create a compiler using the given interpreter, or `python` on PATH
    pub fn new(python: Option<&str>) -> Self {
        Self {
            python: python.unwrap_or("python").to_string(),
        }
    }
}

impl AotCompiler for Nuitka {
    fn compile(&self, module: &ModuleDescriptor, output_dir: &Path) -> BuildResult<BuildOutcome> {
        fs::create_dir_all(output_dir)?;
        tracing::info!("Compiling {}...", module.name);

        let output = Command::new(&self.python)
            .args([
                "-m",
                "nuitka",
                "--module",
                // Optimization
                "--lto=yes",
                "--remove-output",
                // Protection
                "--no-pyi-file",
                // No debug
                "--python-flag=no_site",
                "--python-flag=no_warnings",
            ])
            .arg(format!("--output-dir={}", output_dir.display()))
            .arg(&module.source_path)
            .output()
            .map_err(|e| BuildError::Compile {
                module: module.name.clone(),
                diagnostic: format!("failed to run compiler: {e}"),
            })?;

        if !output.status.success() {
            tracing::error!("Compilation of {} failed", module.name);
        }

        Ok(BuildOutcome {
            module: module.name.clone(),
            success: output.status.success(),
            diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
