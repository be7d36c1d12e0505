//! Configuration management for `cleancheck-core`.
//!
//! A [`ScenarioConfig`] describes one "full clean" scenario: how to invoke the
//! collaborator, which files to stage beforehand, what to expect in its output
//! and where to look inside the produced archive. Scenarios are stored as YAML
//! and every field has a default matching the stock `sos report --clean` run.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default wall-clock budget for the collaborator, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default location of the collaborator's persistent mapping, which is replaced
/// by an empty placeholder so earlier clean runs cannot influence this one.
pub const DEFAULT_MAPPING_DEST: &str = "/etc/sos/cleaner/default_mapping";

/// A file to put in place before the collaborator runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StagedFile {
    /// Content to install. `None` installs an empty placeholder.
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// Where the content goes.
    pub dest: PathBuf,
}

/// Top-level scenario definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Collaborator executable.
    pub command: String,
    /// Arguments placed before the clean flag (e.g. `report --batch`).
    pub subcommand_args: Vec<String>,
    /// The single flag that switches the collaborator into obfuscation mode.
    pub clean_flag: String,
    /// Arguments appended after the clean flag.
    pub extra_args: Vec<String>,
    pub timeout_secs: u64,
    /// Passed as `--tmp-dir` when set.
    pub tmp_dir: Option<PathBuf>,

    /// Journal identifier used for the marker line.
    pub journal_identifier: String,
    /// Write the case-variant hostname marker line before the run.
    pub write_marker: bool,
    pub stage_files: Vec<StagedFile>,

    /// Stdout text announcing where the mapping was written.
    pub mapping_announcement: String,
    /// Regex locating the mapping path in stdout. The last match wins.
    pub mapping_path_pattern: String,
    /// Substring the archive file name must contain.
    pub archive_marker: String,
    /// Regex that a log inside the archive must match.
    pub archive_type_pattern: String,
    /// Log files, relative to the archive content root.
    pub log_files: Vec<PathBuf>,

    /// Overrides for the pre-run snapshot.
    pub hostname: Option<String>,
    pub ip_addr: Option<String>,

    /// Keep the unpacked archive after the report is dropped.
    pub keep_extracted: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            command: "sos".to_string(),
            subcommand_args: vec!["report".to_string(), "--batch".to_string()],
            clean_flag: "--clean".to_string(),
            extra_args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tmp_dir: None,
            journal_identifier: "sos-testing".to_string(),
            write_marker: true,
            stage_files: vec![StagedFile {
                source: None,
                dest: PathBuf::from(DEFAULT_MAPPING_DEST),
            }],
            mapping_announcement: "A mapping of obfuscated elements is available at".to_string(),
            mapping_path_pattern: "/.*sosreport-.*-private_map".to_string(),
            archive_marker: "obfuscated".to_string(),
            archive_type_pattern: "Loaded .* as type sos report directory".to_string(),
            log_files: vec![PathBuf::from("sos_logs/sos.log")],
            hostname: None,
            ip_addr: None,
            keep_extracted: false,
        }
    }
}

impl ScenarioConfig {
    /// Loads a scenario from a YAML file. Missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading scenario from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let config: ScenarioConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse scenario file {}", path.display()))?;

        config.validate()?;
        debug!("Scenario loaded: command '{}', timeout {}s.", config.command, config.timeout_secs);
        Ok(config)
    }

    /// Checks the scenario for mistakes that would make every run meaningless.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.command.trim().is_empty() {
            errors.push("`command` must not be empty.".to_string());
        }
        if self.clean_flag.trim().is_empty() {
            errors.push("`clean_flag` must not be empty.".to_string());
        }
        if self.timeout_secs == 0 {
            errors.push("`timeout_secs` must be greater than 0.".to_string());
        }
        if self.archive_marker.is_empty() {
            errors.push("`archive_marker` must not be empty.".to_string());
        }
        if self.mapping_announcement.is_empty() {
            errors.push("`mapping_announcement` must not be empty.".to_string());
        }
        for (field, pattern) in [
            ("mapping_path_pattern", &self.mapping_path_pattern),
            ("archive_type_pattern", &self.archive_type_pattern),
        ] {
            if let Err(e) = Regex::new(pattern) {
                errors.push(format!("`{}` is not a valid regex: {}", field, e));
            }
        }
        if self.log_files.iter().any(|p| p.is_absolute()) {
            errors.push("`log_files` entries must be relative to the archive root.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Scenario validation failed:\n{}", errors.join("\n")))
        }
    }

    /// The full argv for the collaborator, program first.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.subcommand_args.len() + self.extra_args.len() + 4);
        argv.push(self.command.clone());
        argv.extend(self.subcommand_args.iter().cloned());
        argv.push(self.clean_flag.clone());
        if let Some(tmp) = &self.tmp_dir {
            argv.push("--tmp-dir".to_string());
            argv.push(tmp.to_string_lossy().into_owned());
        }
        argv.extend(self.extra_args.iter().cloned());
        argv
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yml::to_string(self).context("Failed to serialize scenario")
    }
}
