// cleancheck-core/src/lib.rs
//! # cleancheck Core Library
//!
//! `cleancheck-core` drives an external obfuscation tool (by default `sos`) through
//! its clean mode and verifies the result: that the produced archive is named as an
//! obfuscated archive, that the tool recognised its input, that a private mapping
//! was written and contains no empty substitutions, and that neither the machine's
//! hostname (full or short, any casing) nor its IP address survived in any file.
//!
//! The obfuscation engine itself is not part of this crate. It is treated as an
//! opaque collaborator observed only through its stdout, its log and its output.
//!
//! ## Modules
//!
//! * `config`: `ScenarioConfig`, the YAML-backed scenario definition.
//! * `snapshot`: pre-run hostname and IP address.
//! * `journal`: the setup marker line and its sinks.
//! * `staging`: temporary replacement of collaborator files.
//! * `invoke`: the single, time-bounded collaborator invocation.
//! * `capture`: captured output and the paths announced in it.
//! * `archive`: opening and unpacking the output archive.
//! * `search`: token-bounded and literal content search over a tree.
//! * `mapping`: the private mapping file model.
//! * `checks`: the independent checks and their runner.
//! * `scenario`: end-to-end orchestration and the verification report.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cleancheck_core::{run_scenario, ScenarioConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScenarioConfig::default();
//!     let report = run_scenario(&config, None).await?;
//!     for outcome in &report.outcomes {
//!         println!("{} {}", if outcome.passed { "PASS" } else { "FAIL" }, outcome.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failures that stop a run (timeout, spawn failure, non-zero exit, bad
//! configuration) are [`VerifyError`]s. Failing checks are not errors; they are
//! reported as [`CheckOutcome`]s in the [`VerificationReport`].
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod archive;
pub mod capture;
pub mod checks;
pub mod config;
pub mod errors;
pub mod invoke;
pub mod journal;
pub mod mapping;
pub mod scenario;
pub mod search;
pub mod sensitive;
pub mod snapshot;
pub mod staging;

pub use archive::{ArchiveKind, ReportArchive};
pub use capture::{find_archive_path, find_mapping_path, CommandCapture};
pub use checks::{Check, CheckContext, CheckOutcome, CheckRunner, MarkerStatus};
pub use config::{ScenarioConfig, StagedFile, DEFAULT_TIMEOUT_SECS};
pub use errors::VerifyError;
pub use invoke::run_collaborator;
pub use journal::{marker_line, FileSink, JournalSink, SystemdCat};
pub use mapping::{MappingViolation, PrivateMap};
pub use scenario::{run_scenario, verify_capture, VerificationReport};
pub use search::{search_tree, ContentHit, ContentMatcher, LiteralPattern, TokenPattern};
pub use sensitive::redact_sensitive;
pub use snapshot::SystemSnapshot;
pub use staging::FileStager;
