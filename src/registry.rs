//! Module registry: which files the pipeline touches
//!
//! Compile targets are turned into opaque native artifacts; pass-through
//! loader files ship as plain source. Any file in neither list is untouched
//! by the pipeline.

use crate::config::BuildConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A module slated for ahead-of-time compilation
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Module name, e.g. `generator`
    pub name: String,
    /// Source file inside the package tree
    pub source_path: PathBuf,
    /// Glob matching this module's compiled artifact names
    pub artifact_pattern: String,
}

impl ModuleDescriptor {
    /// True when `file_name` is a compiled artifact of this module
    pub fn matches_artifact(&self, file_name: &str) -> bool {
        match regex::Regex::new(&glob_to_regex(&self.artifact_pattern)) {
            Ok(re) => re.is_match(file_name),
            Err(_) => false,
        }
    }
}

/// Static view of the module set, built once from configuration
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    targets: Vec<ModuleDescriptor>,
    passthrough: Vec<PathBuf>,
}

impl ModuleRegistry {
    /// Build the registry from configuration
    pub fn from_config(config: &BuildConfig) -> Self {
        let targets = config
            .compile_modules
            .iter()
            .map(|file| {
                let name = Path::new(file)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone());
                ModuleDescriptor {
                    source_path: config.package_dir.join(file),
                    artifact_pattern: format!("{name}.*"),
                    name,
                }
            })
            .collect();

        let passthrough = config
            .passthrough
            .iter()
            .map(|file| config.package_dir.join(file))
            .collect();

        Self {
            targets,
            passthrough,
        }
    }

    /// Modules to compile, in registry order
    pub fn compile_targets(&self) -> &[ModuleDescriptor] {
        &self.targets
    }

    /// Loader files shipped as plain source
    pub fn passthrough_files(&self) -> &[PathBuf] {
        &self.passthrough
    }

    /// Source basenames that must never appear in a distributable archive
    pub fn disallowed_basenames(&self) -> BTreeSet<String> {
        self.targets
            .iter()
            .filter_map(|t| t.source_path.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    /// The module a compiled artifact belongs to, if any
    pub fn owning_module(&self, artifact_name: &str) -> Option<&ModuleDescriptor> {
        self.targets.iter().find(|t| t.matches_artifact(artifact_name))
    }
}

fn glob_to_regex(pattern: &str) -> String {
    // Normalize separators in pattern too
    let pattern = pattern.replace('\\', "/");
    let chars: Vec<char> = pattern.chars().collect();

    let mut out = String::from("^");
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            // ** or **/
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                // Handle **/ as "zero or more directories"
                if i + 2 < chars.len() && chars[i + 2] == '/' {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                // Match within a single path segment
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '/' => {
                out.push('/');
                i += 1;
            }
            // Escape regex metacharacters
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                out.push('\\');
                out.push(chars[i]);
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModuleRegistry {
        let config = BuildConfig::new("product")
            .compile_module("models.py")
            .compile_module("server.py");
        ModuleRegistry::from_config(&config)
    }

    #[test]
    fn test_targets_follow_config_order() {
        let registry = registry();
        let names: Vec<&str> = registry
            .compile_targets()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["models", "server"]);
        assert_eq!(
            registry.compile_targets()[0].source_path,
            PathBuf::from("product/models.py")
        );
    }

    #[test]
    fn test_disallowed_basenames() {
        let registry = registry();
        let disallowed = registry.disallowed_basenames();
        assert!(disallowed.contains("models.py"));
        assert!(disallowed.contains("server.py"));
        assert!(!disallowed.contains("__init__.py"));
    }

    #[test]
    fn test_artifact_matching() {
        let registry = registry();
        let module = registry
            .owning_module("models.cpython-311-x86_64-linux-gnu.so")
            .expect("artifact should match models");
        assert_eq!(module.name, "models");
        assert!(registry.owning_module("unrelated.so").is_none());
    }

    #[test]
    fn test_passthrough_defaults() {
        let registry = registry();
        assert!(registry
            .passthrough_files()
            .contains(&PathBuf::from("product/__init__.py")));
    }
}
