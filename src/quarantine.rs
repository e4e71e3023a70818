//! Source quarantine: move protected sources out of the package tree before
//! packaging, and back afterward
//!
//! The record returned by [`quarantine`] is the restore obligation for the
//! run. [`restore`] consumes it by value, so a record cannot be replayed
//! twice and the orchestrator cannot drop it without a compiler warning.

use crate::error::{BuildError, BuildResult};
use crate::workspace;
use std::fs;
use std::path::{Path, PathBuf};

/// One source file moved into the backup area
#[derive(Debug, Clone)]
pub struct MovedFile {
    /// Where the file lives in the package tree
    pub original: PathBuf,
    /// Where it sits while the archive is assembled
    pub backup: PathBuf,
}

/// The moved-files mapping for a single pipeline run
#[must_use = "a quarantine record must be passed to restore()"]
#[derive(Debug)]
pub struct QuarantineRecord {
    moved: Vec<MovedFile>,
    backup_dir: PathBuf,
}

impl QuarantineRecord {
    /// Files moved by this run
    pub fn moved(&self) -> &[MovedFile] {
        &self.moved
    }
}

/// A quarantined file that could not be moved back to its original path
#[derive(Debug)]
pub struct RestoreFailure {
    /// The path now missing from the working tree
    pub original: PathBuf,
    /// Last known location of the file
    pub backup: PathBuf,
    /// Underlying failure
    pub reason: String,
}

/// Move each existing file in `files` into `backup_dir`, recording the
/// mapping.
///
/// Files already absent from the tree are skipped. A backup file left behind
/// by an interrupted prior run is authoritative: it is recorded for restore
/// as-is, and any stale package-tree copy is shelved beside it as
/// `<name>.stale` instead of overwriting it.
///
/// If a move fails midway, everything already moved is put back before the
/// failure is reported, so the tree is never left partially stripped.
pub fn quarantine(files: &[PathBuf], backup_dir: &Path) -> BuildResult<QuarantineRecord> {
    fs::create_dir_all(backup_dir)?;
    let mut record = QuarantineRecord {
        moved: Vec::new(),
        backup_dir: backup_dir.to_path_buf(),
    };

    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let backup = backup_dir.join(name);

        if backup.exists() {
            tracing::warn!(
                "Backup already holds {}, keeping it from the interrupted prior run",
                backup.display()
            );
            if file.exists() {
                let stale = stale_shelf(&backup);
                if let Err(e) = workspace::move_file(file, &stale) {
                    return unwind(record, file, &e);
                }
                tracing::warn!("Shelved stale tree copy at {}", stale.display());
            }
            record.moved.push(MovedFile {
                original: file.clone(),
                backup,
            });
            continue;
        }

        if !file.exists() {
            tracing::debug!("Skipping absent source {}", file.display());
            continue;
        }

        match workspace::move_file(file, &backup) {
            Ok(()) => {
                tracing::info!("Backed up {}", file.display());
                record.moved.push(MovedFile {
                    original: file.clone(),
                    backup,
                });
            }
            Err(e) => return unwind(record, file, &e),
        }
    }

    Ok(record)
}

/// Move every recorded file back to its original path.
///
/// Unlike compilation, restoration never stops at the first failure: it
/// maximizes recovered state and returns the aggregate of failures. The
/// backup directory is removed only when it is left empty.
pub fn restore(record: QuarantineRecord) -> Vec<RestoreFailure> {
    let mut failures = Vec::new();

    for MovedFile { original, backup } in record.moved {
        match workspace::move_file(&backup, &original) {
            Ok(()) => tracing::info!("Restored {}", original.display()),
            Err(e) => failures.push(RestoreFailure {
                original,
                backup,
                reason: e.to_string(),
            }),
        }
    }

    if let Ok(mut entries) = fs::read_dir(&record.backup_dir) {
        if entries.next().is_none() {
            let _ = fs::remove_dir(&record.backup_dir);
        }
    }

    failures
}

/// Put back whatever was already moved, then report the triggering failure.
fn unwind(
    record: QuarantineRecord,
    failed_file: &Path,
    error: &BuildError,
) -> BuildResult<QuarantineRecord> {
    for failure in restore(record) {
        tracing::error!(
            "Could not return {} from {}: {}",
            failure.original.display(),
            failure.backup.display(),
            failure.reason
        );
    }
    Err(BuildError::QuarantineMove {
        path: failed_file.to_path_buf(),
        reason: error.to_string(),
    })
}

fn stale_shelf(backup: &Path) -> PathBuf {
    let mut name = backup
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".stale");
    backup.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_quarantine_restore_round_trip() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("product");
        let backup_dir = temp.path().join("._py_backup");
        fs::create_dir_all(&package).unwrap();
        let models = package.join("models.py");
        let server = package.join("server.py");
        fs::write(&models, b"models source").unwrap();
        fs::write(&server, b"server source").unwrap();

        let record = quarantine(&[models.clone(), server.clone()], &backup_dir).unwrap();
        assert_eq!(record.moved().len(), 2);
        assert!(!models.exists());
        assert!(!server.exists());
        assert!(backup_dir.join("models.py").exists());

        let failures = restore(record);
        assert!(failures.is_empty());
        assert_eq!(fs::read(&models).unwrap(), b"models source");
        assert_eq!(fs::read(&server).unwrap(), b"server source");
        assert!(!backup_dir.exists());
    }

    #[test]
    fn test_quarantine_skips_absent_files() {
        let temp = TempDir::new().unwrap();
        let backup_dir = temp.path().join("._py_backup");
        let record = quarantine(&[temp.path().join("missing.py")], &backup_dir).unwrap();
        assert!(record.moved().is_empty());
        let failures = restore(record);
        assert!(failures.is_empty());
        assert!(!backup_dir.exists());
    }

    #[test]
    fn test_existing_backup_is_authoritative() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("product");
        let backup_dir = temp.path().join("._py_backup");
        fs::create_dir_all(&package).unwrap();
        fs::create_dir_all(&backup_dir).unwrap();
        let models = package.join("models.py");
        fs::write(&models, b"stale tree copy").unwrap();
        fs::write(backup_dir.join("models.py"), b"authoritative").unwrap();

        let record = quarantine(&[models.clone()], &backup_dir).unwrap();

        // The prior run's backup was not overwritten
        assert_eq!(
            fs::read(backup_dir.join("models.py")).unwrap(),
            b"authoritative"
        );
        // The stale tree copy was shelved, not destroyed
        assert_eq!(
            fs::read(backup_dir.join("models.py.stale")).unwrap(),
            b"stale tree copy"
        );

        let failures = restore(record);
        assert!(failures.is_empty());
        assert_eq!(fs::read(&models).unwrap(), b"authoritative");
        // The shelf keeps the backup dir alive for manual inspection
        assert!(backup_dir.join("models.py.stale").exists());
    }

    #[test]
    fn test_restore_reports_missing_backup() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("product");
        let backup_dir = temp.path().join("._py_backup");
        fs::create_dir_all(&package).unwrap();
        let models = package.join("models.py");
        fs::write(&models, b"source").unwrap();

        let record = quarantine(&[models.clone()], &backup_dir).unwrap();
        // Simulate an outside actor stealing the backup mid-run
        fs::remove_file(backup_dir.join("models.py")).unwrap();

        let failures = restore(record);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].original, models);
        assert_eq!(failures[0].backup, backup_dir.join("models.py"));
    }
}
