//! Build orchestration
//!
//! Sequences Clean -> Compile -> Relocate -> Quarantine -> Assemble ->
//! Verify -> Restore. Entry into the quarantined state is the single point
//! after which restore becomes mandatory: the fallible assemble/verify steps
//! run before restore in straight-line code, and their result is only
//! inspected after restore has already happened.

use crate::assemble::{Packager, WheelBuilder};
use crate::compiler::{AotCompiler, Nuitka};
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::quarantine::{self, RestoreFailure};
use crate::registry::ModuleRegistry;
use crate::relocate;
use crate::verify::{self, VerificationReport};
use crate::workspace;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// What a pipeline run did and how it ended
#[derive(Debug)]
pub struct PipelineReport {
    /// Artifacts placed into the package tree
    pub relocated: Vec<PathBuf>,
    /// Archive produced by the assembler, if assembly ran and succeeded
    pub archive: Option<PathBuf>,
    /// Leak verification result, if verification ran
    pub verification: Option<VerificationReport>,
    /// The failure that ended the run, if any
    pub failure: Option<BuildError>,
    /// Quarantined files that could not be moved back
    pub restore_failures: Vec<RestoreFailure>,
}

impl PipelineReport {
    /// True only when every stage succeeded and verification passed
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
            && self.restore_failures.is_empty()
            && self.verification.as_ref().is_some_and(|v| v.passed)
    }

    fn failed(failure: BuildError) -> Self {
        Self {
            relocated: Vec::new(),
            archive: None,
            verification: None,
            failure: Some(failure),
            restore_failures: Vec::new(),
        }
    }
}

/// The protection build pipeline
pub struct Pipeline<C, P> {
    config: BuildConfig,
    registry: ModuleRegistry,
    compiler: C,
    packager: P,
}

impl Pipeline<Nuitka, WheelBuilder> {
    /// Pipeline wired to the real external tools from configuration
    pub fn from_config(config: BuildConfig) -> Self {
        let compiler = Nuitka::new(config.python.as_deref());
        let packager = WheelBuilder::new(
            config.python.as_deref(),
            config.project_root.clone(),
            config.dist_dir.clone(),
        );
        Self::with_tools(config, compiler, packager)
    }
}

impl<C: AotCompiler, P: Packager> Pipeline<C, P> {
    /// Pipeline with explicit tool implementations
    pub fn with_tools(config: BuildConfig, compiler: C, packager: P) -> Self {
        let registry = ModuleRegistry::from_config(&config);
        Self {
            config,
            registry,
            compiler,
            packager,
        }
    }

    /// The registry derived from this pipeline's configuration
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run the pipeline to completion.
    ///
    /// Failures before quarantine return immediately; the tree has not been
    /// touched source-wise and there is nothing to restore. Once sources are
    /// quarantined, restore runs no matter how assembly or verification end,
    /// and restore failures are reported in addition to the triggering
    /// failure, never instead of it.
    pub fn run(&self) -> PipelineReport {
        if self.registry.compile_targets().is_empty() {
            return PipelineReport::failed(BuildError::Config(
                "no modules configured to compile".to_string(),
            ));
        }

        self.clean();

        if let Err(failure) = self.compile_all() {
            self.discard_scratch();
            return PipelineReport::failed(failure);
        }

        let relocated =
            match relocate::relocate(&self.config.scratch_dir, &self.config, &self.registry) {
                Ok(relocated) => relocated,
                Err(failure) => {
                    self.discard_scratch();
                    return PipelineReport::failed(failure);
                }
            };
        self.discard_scratch();

        let sources: Vec<PathBuf> = self
            .registry
            .compile_targets()
            .iter()
            .map(|t| t.source_path.clone())
            .collect();
        let record = match quarantine::quarantine(&sources, &self.config.backup_dir) {
            Ok(record) => record,
            Err(failure) => {
                return PipelineReport {
                    relocated,
                    archive: None,
                    verification: None,
                    failure: Some(failure),
                    restore_failures: Vec::new(),
                }
            }
        };

        // Restore is owed from here on, whatever happens in between
        let packaged = self.assemble_and_verify();
        let restore_failures = quarantine::restore(record);
        for failure in &restore_failures {
            tracing::error!(
                "SOURCE NOT RESTORED: {} (last seen at {}): {}",
                failure.original.display(),
                failure.backup.display(),
                failure.reason
            );
        }

        let (archive, verification, failure) = match packaged {
            Ok((archive, verification)) => {
                if verification.passed {
                    (Some(archive), Some(verification), None)
                } else {
                    let entries = verification.disallowed_entries.clone();
                    (
                        Some(archive),
                        Some(verification),
                        Some(BuildError::Leak(entries)),
                    )
                }
            }
            Err(failure) => (None, None, Some(failure)),
        };

        PipelineReport {
            relocated,
            archive,
            verification,
            failure,
            restore_failures,
        }
    }

    /// Remove prior build output and stray artifacts (best effort).
    ///
    /// The backup directory is deliberately left alone: it may hold source
    /// from an interrupted prior run that quarantine treats as
    /// authoritative.
    fn clean(&self) {
        let mut paths = vec![
            self.config.dist_dir.clone(),
            self.config.project_root.join("build"),
            self.config.scratch_dir.clone(),
        ];

        // Compiler .build litter and egg-info in the project root
        if let Ok(entries) = fs::read_dir(&self.config.project_root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".build") || name.ends_with(".egg-info") {
                    paths.push(entry.path());
                }
            }
        }

        // Stray artifacts and intermediates anywhere in the package tree
        for entry in WalkDir::new(&self.config.package_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
        {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if ext == self.config.intermediate_extension
                || self.config.artifact_extensions.iter().any(|a| a == ext)
            {
                paths.push(path.to_path_buf());
            }
        }

        workspace::clean(&paths);
    }

    /// Compile every target in registry order, aborting on the first failure.
    ///
    /// A partially compiled module set is worse than no build: the
    /// protection guarantee only holds when every listed module is compiled.
    fn compile_all(&self) -> BuildResult<()> {
        fs::create_dir_all(&self.config.scratch_dir)?;
        for module in self.registry.compile_targets() {
            if !module.source_path.exists() {
                tracing::warn!(
                    "Source missing for {} ({}), skipping",
                    module.name,
                    module.source_path.display()
                );
                continue;
            }
            let outcome = self.compiler.compile(module, &self.config.scratch_dir)?;
            if !outcome.success {
                return Err(BuildError::Compile {
                    module: outcome.module,
                    diagnostic: outcome.diagnostic,
                });
            }
        }
        Ok(())
    }

    fn assemble_and_verify(&self) -> BuildResult<(PathBuf, VerificationReport)> {
        let archive = self.packager.assemble()?;
        let report = verify::verify(
            &archive,
            &self.registry.disallowed_basenames(),
            &self.config.intermediate_extension,
            &self.scope_prefix(),
        )?;
        Ok((archive, report))
    }

    /// Archive entry prefix covering the package tree, e.g. `product/`
    fn scope_prefix(&self) -> String {
        let name = self
            .config
            .package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{name}/")
    }

    fn discard_scratch(&self) {
        if self.config.keep_scratch {
            tracing::debug!(
                "Keeping scratch directory {}",
                self.config.scratch_dir.display()
            );
            return;
        }
        workspace::clean(&[self.config.scratch_dir.clone()]);
    }
}
