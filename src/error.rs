//! Error types for shroud

use std::path::PathBuf;
use thiserror::Error;

/// Build pipeline error types
#[derive(Debug, Error)]
pub enum BuildError {
    /// External compiler returned non-zero for a module
    #[error("Compilation failed for {module}: {diagnostic}")]
    Compile {
        /// Module that failed to compile
        module: String,
        /// Compiler diagnostic output, captured verbatim
        diagnostic: String,
    },

    /// Artifact is held open by another process and cannot be replaced
    #[error("Cannot replace {}: file is in use by another process - stop the server first", .0.display())]
    FileLocked(PathBuf),

    /// A source file could not be moved into the backup area
    #[error("Failed to quarantine {}: {reason}", .path.display())]
    QuarantineMove {
        /// Source file that could not be moved
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Packaging tool failed or produced no archive
    #[error("Assembly failed: {0}")]
    Assembly(String),

    /// Verification found disallowed entries in the archive
    #[error("Source exposed in output: {}", .0.join(", "))]
    Leak(Vec<String>),

    /// Archive could not be opened or enumerated
    #[error("Archive error: {0}")]
    Archive(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for build pipeline operations
pub type BuildResult<T> = Result<T, BuildError>;
