//! Archive leak verification
//!
//! Opens the produced archive read-only, without extracting to disk, and
//! flags any entry that exposes protected source: a basename matching a
//! quarantined module file, or an intermediate compiler-generated source
//! left under the package prefix.

use crate::error::{BuildError, BuildResult};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// What the verifier found in one archive
#[derive(Debug)]
pub struct VerificationReport {
    /// The inspected archive
    pub archive: PathBuf,
    /// Entries that violate the disallow policy
    pub disallowed_entries: Vec<String>,
    /// True when no disallowed entry was found
    pub passed: bool,
}

/// Scan `archive_path` against the disallow policy.
///
/// An entry is disallowed when its basename is in `disallowed_basenames`
/// (an original source filename), or when it sits under `scope_prefix` and
/// ends with `.<disallowed_extension>` (a leaked intermediate). Same-named
/// binary artifacts never match: the policy compares full basenames, so
/// `models.so` is fine while `models.py` is not.
pub fn verify(
    archive_path: &Path,
    disallowed_basenames: &BTreeSet<String>,
    disallowed_extension: &str,
    scope_prefix: &str,
) -> BuildResult<VerificationReport> {
    let file = File::open(archive_path)?;
    let archive = ZipArchive::new(file)
        .map_err(|e| BuildError::Archive(format!("{}: {e}", archive_path.display())))?;

    tracing::info!("Verifying {}...", archive_path.display());
    let suffix = format!(".{disallowed_extension}");
    let mut disallowed = Vec::new();
    let mut in_scope = Vec::new();

    for name in archive.file_names() {
        let basename = name.rsplit('/').next().unwrap_or(name);
        if disallowed_basenames.contains(basename) {
            disallowed.push(name.to_string());
        } else if name.starts_with(scope_prefix) && name.ends_with(&suffix) {
            disallowed.push(name.to_string());
        }
        if name.starts_with(scope_prefix) {
            in_scope.push(name.to_string());
        }
    }
    disallowed.sort();

    let passed = disallowed.is_empty();
    if passed {
        in_scope.sort();
        tracing::info!("No source exposed. Archive contents under {scope_prefix}:");
        for entry in &in_scope {
            tracing::info!("  {entry}");
        }
    } else {
        for entry in &disallowed {
            tracing::error!("Leaked entry: {entry}");
        }
    }

    Ok(VerificationReport {
        archive: archive_path.to_path_buf(),
        disallowed_entries: disallowed,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_archive(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for name in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"payload").unwrap();
        }
        writer.finish().unwrap();
    }

    fn disallowed() -> BTreeSet<String> {
        ["models.py".to_string(), "server.py".to_string()]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_clean_archive_passes() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("product.whl");
        write_archive(
            &archive,
            &[
                "product/__init__.py",
                "product/models.cpython-311.so",
                "product-0.1.0.dist-info/METADATA",
            ],
        );

        let report = verify(&archive, &disallowed(), "c", "product/").unwrap();
        assert!(report.passed);
        assert!(report.disallowed_entries.is_empty());
    }

    #[test]
    fn test_flags_source_basename_anywhere() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("product.whl");
        write_archive(&archive, &["product/inner/models.py", "product/ok.txt"]);

        let report = verify(&archive, &disallowed(), "c", "product/").unwrap();
        assert!(!report.passed);
        assert_eq!(report.disallowed_entries, vec!["product/inner/models.py"]);
    }

    #[test]
    fn test_flags_intermediate_only_under_scope() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("product.whl");
        write_archive(&archive, &["product/models.c", "vendor/other.c"]);

        let report = verify(&archive, &disallowed(), "c", "product/").unwrap();
        assert_eq!(report.disallowed_entries, vec!["product/models.c"]);
    }

    #[test]
    fn test_no_false_positive_on_same_named_artifact() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("product.whl");
        write_archive(&archive, &["product/models.so", "product/server.pyd"]);

        let report = verify(&archive, &disallowed(), "c", "product/").unwrap();
        assert!(report.passed);
    }

    #[test]
    fn test_unreadable_archive_is_reported() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("not-a-zip.whl");
        std::fs::write(&bogus, b"plain text").unwrap();

        match verify(&bogus, &disallowed(), "c", "product/") {
            Err(BuildError::Archive(_)) => {}
            other => panic!("expected Archive error, got {other:?}"),
        }
    }
}
