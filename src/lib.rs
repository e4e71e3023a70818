//! Shroud - Source-Protection Packaging
//!
//! Builds a distributable archive that carries none of a product's
//! proprietary source: each protected module is compiled ahead-of-time into
//! an opaque native extension, the source files are moved out of the package
//! tree for the duration of packaging, the produced wheel is scanned for
//! leaks, and the source tree is restored unconditionally.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Pipeline Run                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Clean ──► Compile (nuitka, per module) ──► Relocate artifacts  │
//! │                                                   │             │
//! │                                                   ▼             │
//! │            Quarantine source ──► Assemble wheel ──► Verify      │
//! │                    │                                  │         │
//! │                    └───────── Restore (always) ◄──────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Compile and relocate failures abort before any source is moved, so the
//! tree needs no recovery. Once quarantine has run, restore is guaranteed on
//! every exit path; a failed restore is reported in addition to whatever
//! failure triggered it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shroud::{BuildConfig, Pipeline};
//!
//! let config = BuildConfig::new("product")
//!     .compile_module("models.py")
//!     .compile_module("server.py");
//!
//! let report = Pipeline::from_config(config).run();
//! if !report.succeeded() {
//!     // report.failure distinguishes a failed build from exposed source
//! }
//! ```

pub mod assemble;
pub mod compiler;
mod config;
mod error;
pub mod pipeline;
pub mod quarantine;
pub mod registry;
pub mod relocate;
pub mod verify;
pub mod workspace;

pub use assemble::{Packager, WheelBuilder};
pub use compiler::{AotCompiler, BuildOutcome, Nuitka};
pub use config::BuildConfig;
pub use error::{BuildError, BuildResult};
pub use pipeline::{Pipeline, PipelineReport};
pub use quarantine::{quarantine, restore, MovedFile, QuarantineRecord, RestoreFailure};
pub use registry::{ModuleDescriptor, ModuleRegistry};
pub use verify::{verify, VerificationReport};
pub use workspace::ReplaceOutcome;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
