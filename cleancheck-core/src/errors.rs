//! errors.rs - Error types for the cleancheck-core library.
//!
//! These are the scenario-level failures: anything that stops a run before the
//! checks can be evaluated. A failing check is not an error; it is a
//! [`crate::checks::CheckOutcome`] with `passed == false`.
//!
//! License: MIT OR APACHE 2.0

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All scenario-level failures raised by `cleancheck-core`.
///
/// `#[non_exhaustive]` so new failure kinds can be added without breaking
/// downstream matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VerifyError {
    #[error("Invalid scenario configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' did not finish within {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' exited with status {status}: {stderr_tail}")]
    CollaboratorFailed {
        command: String,
        status: String,
        stderr_tail: String,
    },

    #[error("Could not determine the system hostname")]
    HostnameUnavailable,

    #[error("No archive path found in the captured output")]
    ArchiveNotAnnounced,

    #[error("Archive unavailable: {0}")]
    ArchiveUnavailable(String),

    #[error("Unsupported archive '{0}': expected a directory, .tar, .tar.gz, .tgz or .tar.xz")]
    UnsupportedArchive(PathBuf),

    #[error("Archive entry '{0}' escapes the extraction directory")]
    UnsafeArchiveEntry(String),

    #[error("Failed to parse mapping file {path}: {source}")]
    MappingParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pattern '{0}': {1}")]
    Pattern(String, regex::Error),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),
}

impl VerifyError {
    /// True for failures that the scenario treats as hard failures of the
    /// whole run rather than configuration mistakes.
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            VerifyError::Timeout { .. }
                | VerifyError::Spawn { .. }
                | VerifyError::CollaboratorFailed { .. }
        )
    }
}
