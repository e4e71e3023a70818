//! Filesystem choreography for the protection build
//!
//! The package tree on disk is the critical shared resource; the pipeline
//! assumes single-writer access. The one expected contention source is a
//! long-running consumer process holding an old artifact open, which the
//! replace logic recovers from with a rename-aside.

use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a [`safe_replace`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Target was overwritten directly
    Replaced,
    /// Target was held open; the previous file was renamed aside first
    ReplacedAfterRename {
        /// Where the previous file ended up
        renamed_to: PathBuf,
    },
}

/// Best-effort removal of prior build artifacts.
///
/// A locked artifact that cannot be deleted is expected when a consuming
/// process is running; removal failures are logged and skipped, relying on
/// the replace-with-rename logic during relocation.
pub fn clean(paths: &[PathBuf]) {
    for path in paths {
        if !path.exists() {
            continue;
        }
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) => tracing::warn!(
                "Could not remove {} ({}), will be replaced in place",
                path.display(),
                e
            ),
        }
    }
}

/// Replace `target` with the contents of `new_content`.
///
/// Tries a direct overwrite first. If the existing file cannot be removed
/// (held open by a running consumer), it is renamed to `<name>.old` and the
/// new content is placed at the original path. If the rename fails too, the
/// file cannot be replaced at all and [`BuildError::FileLocked`] is returned;
/// the target is left either as the old content or as the new content, never
/// half-written.
pub fn safe_replace(target: &Path, new_content: &Path) -> BuildResult<ReplaceOutcome> {
    let mut outcome = ReplaceOutcome::Replaced;
    if target.exists() {
        if let Err(remove_err) = fs::remove_file(target) {
            tracing::debug!(
                "Direct removal of {} failed ({}), renaming aside",
                target.display(),
                remove_err
            );
            let renamed_to = shelve_locked(target)?;
            tracing::warn!(
                "Renamed locked {} to {}",
                target.display(),
                renamed_to.display()
            );
            outcome = ReplaceOutcome::ReplacedAfterRename { renamed_to };
        }
    }
    fs::copy(new_content, target)?;
    Ok(outcome)
}

/// Rename `target` to its `<name>.old` sibling, removing any stale `.old`
/// left by a previous build first.
fn shelve_locked(target: &Path) -> BuildResult<PathBuf> {
    let aside = sibling_old(target);
    if aside.exists() {
        // Stale shelf from an earlier rebuild; its consumer is long gone
        let _ = fs::remove_file(&aside);
    }
    fs::rename(target, &aside).map_err(|_| BuildError::FileLocked(target.to_path_buf()))?;
    Ok(aside)
}

fn sibling_old(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".old");
    path.with_file_name(name)
}

/// Move a file, falling back to copy-then-unlink across filesystems.
///
/// Failures are propagated, not swallowed: losing track of a moved source
/// file would corrupt the working tree.
pub fn move_file(from: &Path, to: &Path) -> BuildResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
    }
}
