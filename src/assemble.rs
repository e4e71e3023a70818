//! Distributable archive assembly via the external packaging tool

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

/// Narrow seam over the external packaging tool, so the pipeline's tests can
/// substitute a deterministic fake.
pub trait Packager {
    /// Build an archive from the current tree state and return its path.
    fn assemble(&self) -> BuildResult<PathBuf>;
}

/// Wheel builder: `python -m build --wheel`, archives land under `dist_dir`
pub struct WheelBuilder {
    python: String,
    project_root: PathBuf,
    dist_dir: PathBuf,
}

impl WheelBuilder {
    /// Create a builder running in `project_root` with wheels expected under
    /// `dist_dir`
    pub fn new(
        python: Option<&str>,
        project_root: impl Into<PathBuf>,
        dist_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            python: python.unwrap_or("python").to_string(),
            project_root: project_root.into(),
            dist_dir: dist_dir.into(),
        }
    }
}

impl Packager for WheelBuilder {
    fn assemble(&self) -> BuildResult<PathBuf> {
        tracing::info!("Building wheel...");
        let output = Command::new(&self.python)
            .args(["-m", "build", "--wheel"])
            .current_dir(&self.project_root)
            .output()
            .map_err(|e| BuildError::Assembly(format!("failed to run packaging tool: {e}")))?;

        if !output.status.success() {
            return Err(BuildError::Assembly(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        newest_wheel(&self.dist_dir)?.ok_or_else(|| {
            BuildError::Assembly(format!("no wheel produced under {}", self.dist_dir.display()))
        })
    }
}

/// Newest `.whl` in `dir` by modification time, if any.
fn newest_wheel(dir: &Path) -> BuildResult<Option<PathBuf>> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(None);
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("whl") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
