//! Moves compiled artifacts from the compiler output into the package tree

use crate::config::BuildConfig;
use crate::error::BuildResult;
use crate::registry::ModuleRegistry;
use crate::workspace::{self, ReplaceOutcome};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy every compiled artifact in `output_dir` into the package tree,
/// replacing whatever was there.
///
/// Artifacts are copied rather than moved so the output directory can be
/// discarded wholly afterward regardless of outcome. A locked target aborts
/// the whole relocation; anything already placed is a superset of the old
/// binary set and is left alone.
pub fn relocate(
    output_dir: &Path,
    config: &BuildConfig,
    registry: &ModuleRegistry,
) -> BuildResult<Vec<PathBuf>> {
    let mut relocated = Vec::new();
    if !output_dir.exists() {
        return Ok(relocated);
    }

    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !config.artifact_extensions.iter().any(|a| a == ext) {
            continue;
        }

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        let target = config.package_dir.join(&file_name);

        match workspace::safe_replace(&target, &path)? {
            ReplaceOutcome::Replaced => {}
            ReplaceOutcome::ReplacedAfterRename { renamed_to } => {
                tracing::debug!("Previous artifact shelved at {}", renamed_to.display());
            }
        }

        match registry.owning_module(&name) {
            Some(module) => tracing::info!("Placed {} artifact {}", module.name, name),
            None => tracing::info!("Placed artifact {}", name),
        }
        relocated.push(target);
    }

    Ok(relocated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relocate_copies_artifacts_only() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let package = temp.path().join("product");
        fs::create_dir_all(&out).unwrap();
        fs::create_dir_all(&package).unwrap();
        fs::write(out.join("models.cpython-311.so"), b"elf").unwrap();
        fs::write(out.join("models.c"), b"intermediate").unwrap();
        fs::write(package.join("models.cpython-311.so"), b"stale").unwrap();

        let config = BuildConfig::new(&package).compile_module("models.py");
        let registry = ModuleRegistry::from_config(&config);
        let relocated = relocate(&out, &config, &registry).unwrap();

        assert_eq!(relocated, vec![package.join("models.cpython-311.so")]);
        assert_eq!(
            fs::read(package.join("models.cpython-311.so")).unwrap(),
            b"elf"
        );
        // Intermediates never reach the package tree
        assert!(!package.join("models.c").exists());
        // Output dir keeps its copies for later discard
        assert!(out.join("models.cpython-311.so").exists());
    }

    #[test]
    fn test_relocate_tolerates_missing_output_dir() {
        let temp = TempDir::new().unwrap();
        let config = BuildConfig::new(temp.path().join("product"));
        let registry = ModuleRegistry::from_config(&config);
        let relocated = relocate(&temp.path().join("never"), &config, &registry).unwrap();
        assert!(relocated.is_empty());
    }
}
