//! Configuration for the protection build

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a protection build
///
/// Constructed once at process start and never mutated afterward; the
/// pipeline only reads from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Package root containing loader files and, pre-build, the source
    /// modules to protect
    pub package_dir: PathBuf,

    /// Project root the packaging tool runs in
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Directory the packaging tool drops archives into
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Scratch directory for raw compiler output
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Backup directory for quarantined source
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Python interpreter used for the compiler and packaging tool
    /// (default: `python` on PATH)
    #[serde(default)]
    pub python: Option<String>,

    /// Module source files to compile, relative to `package_dir`
    #[serde(default)]
    pub compile_modules: Vec<String>,

    /// Loader files shipped as plain source, relative to `package_dir`
    #[serde(default = "default_passthrough")]
    pub passthrough: Vec<String>,

    /// File extensions recognized as compiled artifacts
    #[serde(default = "default_artifact_extensions")]
    pub artifact_extensions: Vec<String>,

    /// Extension of intermediate compiler-generated sources that must never
    /// ship
    #[serde(default = "default_intermediate_extension")]
    pub intermediate_extension: String,

    /// Keep the scratch directory after the run for debugging
    #[serde(default)]
    pub keep_scratch: bool,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("._nuitka_out")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("._py_backup")
}

fn default_passthrough() -> Vec<String> {
    vec!["__init__.py".to_string(), "__main__.py".to_string()]
}

fn default_artifact_extensions() -> Vec<String> {
    vec!["so".to_string(), "pyd".to_string()]
}

fn default_intermediate_extension() -> String {
    "c".to_string()
}

impl BuildConfig {
    /// Create a config for the given package root with defaults
    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_dir: package_dir.into(),
            project_root: default_project_root(),
            dist_dir: default_dist_dir(),
            scratch_dir: default_scratch_dir(),
            backup_dir: default_backup_dir(),
            python: None,
            compile_modules: vec![],
            passthrough: default_passthrough(),
            artifact_extensions: default_artifact_extensions(),
            intermediate_extension: default_intermediate_extension(),
            keep_scratch: false,
        }
    }

    /// Set the Python interpreter
    pub fn python(mut self, path: impl Into<String>) -> Self {
        self.python = Some(path.into());
        self
    }

    /// Add a module source file to compile
    pub fn compile_module(mut self, file: impl Into<String>) -> Self {
        self.compile_modules.push(file.into());
        self
    }

    /// Add a loader file shipped as plain source
    pub fn passthrough(mut self, file: impl Into<String>) -> Self {
        self.passthrough.push(file.into());
        self
    }

    /// Keep the scratch directory after the run
    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    /// Anchor the project root and every pipeline directory under `root`
    pub fn rooted_at(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.dist_dir = root.join("dist");
        self.scratch_dir = root.join("._nuitka_out");
        self.backup_dir = root.join("._py_backup");
        self.project_root = root;
        self
    }
}
