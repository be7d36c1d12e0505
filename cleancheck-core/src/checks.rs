//! The fixed, ordered set of independent checks run against a clean run.
//!
//! Each check has a single pass/fail contract and reports the offending
//! content itself. A check that cannot be evaluated (for instance because the
//! archive could not be opened) fails on its own; the runner always evaluates
//! every check.

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::archive::ReportArchive;
use crate::capture::{find_mapping_path, CommandCapture};
use crate::config::ScenarioConfig;
use crate::errors::VerifyError;
use crate::mapping::PrivateMap;
use crate::search::{search_tree, ContentHit, ContentMatcher, LiteralPattern, TokenPattern};
use crate::snapshot::SystemSnapshot;

/// What happened to the setup marker line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum MarkerStatus {
    /// Written to the named sink.
    Written(String),
    Disabled,
    Failed(String),
}

/// Everything a check may look at. All of it is read-only.
pub struct CheckContext<'a> {
    pub config: &'a ScenarioConfig,
    pub capture: &'a CommandCapture,
    pub snapshot: &'a SystemSnapshot,
    /// The opened archive, or why it could not be opened.
    pub archive: Result<&'a ReportArchive, String>,
    pub marker: &'a MarkerStatus,
}

impl<'a> CheckContext<'a> {
    fn archive(&self) -> Result<&'a ReportArchive, VerifyError> {
        self.archive
            .clone()
            .map_err(VerifyError::ArchiveUnavailable)
    }

    fn mapping_path(&self) -> Result<Option<PathBuf>, VerifyError> {
        find_mapping_path(&self.capture.stdout, &self.config.mapping_path_pattern)
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    pub message: String,
    /// Offending files/lines, violations, or the missing text.
    pub evidence: Vec<String>,
}

impl CheckOutcome {
    pub fn pass(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.into(),
            evidence: Vec::new(),
        }
    }

    pub fn fail(name: &str, message: impl Into<String>, evidence: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.into(),
            evidence,
        }
    }
}

pub trait Check {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError>;
}

/// The setup step's own outcome, so a missing marker is visible in the report.
pub struct MarkerWritten;

impl Check for MarkerWritten {
    fn name(&self) -> &'static str {
        "marker_written"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        Ok(match ctx.marker {
            MarkerStatus::Written(sink) => {
                CheckOutcome::pass(self.name(), format!("Hostname marker written to {}", sink))
            }
            MarkerStatus::Disabled => CheckOutcome::pass(self.name(), "Marker disabled for this run"),
            MarkerStatus::Failed(why) => CheckOutcome::fail(
                self.name(),
                "Hostname marker could not be written",
                vec![why.clone()],
            ),
        })
    }
}

pub struct PrivateMapWasGenerated;

impl Check for PrivateMapWasGenerated {
    fn name(&self) -> &'static str {
        "private_map_was_generated"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        let announcement = &ctx.config.mapping_announcement;
        if !ctx.capture.contains(announcement) {
            return Ok(CheckOutcome::fail(
                self.name(),
                "Output does not announce a mapping file",
                vec![format!("missing from stdout: '{}'", announcement)],
            ));
        }
        let Some(path) = ctx.mapping_path()? else {
            return Ok(CheckOutcome::fail(
                self.name(),
                "No mapping path found in stdout",
                vec![format!("no match for /{}/", ctx.config.mapping_path_pattern)],
            ));
        };
        if path.is_file() {
            Ok(CheckOutcome::pass(
                self.name(),
                format!("Mapping written to {}", path.display()),
            ))
        } else {
            Ok(CheckOutcome::fail(
                self.name(),
                "Announced mapping file does not exist",
                vec![path.display().to_string()],
            ))
        }
    }
}

pub struct TarballNamedObfuscated;

impl Check for TarballNamedObfuscated {
    fn name(&self) -> &'static str {
        "tarball_named_obfuscated"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        let archive = ctx.archive()?;
        let name = archive.file_name();
        let marker = &ctx.config.archive_marker;
        if name.contains(marker.as_str()) {
            Ok(CheckOutcome::pass(self.name(), format!("'{}' carries '{}'", name, marker)))
        } else {
            Ok(CheckOutcome::fail(
                self.name(),
                format!("Archive name lacks '{}'", marker),
                vec![name],
            ))
        }
    }
}

pub struct ArchiveTypeCorrect;

impl Check for ArchiveTypeCorrect {
    fn name(&self) -> &'static str {
        "archive_type_correct"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        let archive = ctx.archive()?;
        let pattern = &ctx.config.archive_type_pattern;
        let re = Regex::new(pattern).map_err(|e| VerifyError::Pattern(pattern.clone(), e))?;

        let mut tried = Vec::new();
        for rel in &ctx.config.log_files {
            match archive.read_log(rel) {
                Ok(text) => {
                    if let Some(m) = re.find(&text) {
                        return Ok(CheckOutcome::pass(
                            self.name(),
                            format!("{}: {}", rel.display(), m.as_str()),
                        ));
                    }
                    tried.push(format!("{}: no match", rel.display()));
                }
                Err(e) => tried.push(format!("{}: {}", rel.display(), e)),
            }
        }
        Ok(CheckOutcome::fail(
            self.name(),
            format!("No log matches /{}/", pattern),
            tried,
        ))
    }
}

pub struct HostnameNotInAnyFile;

impl Check for HostnameNotInAnyFile {
    fn name(&self) -> &'static str {
        "hostname_not_in_any_file"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        let archive = ctx.archive()?;
        let host = ctx.snapshot.hostname.as_str();
        let short = ctx.snapshot.short_hostname();

        let mut hits = search_tree(archive.root(), &TokenPattern::new(host)?);
        if !short.eq_ignore_ascii_case(host) {
            // A full-name hit is usually also a short-name hit; list each file once.
            let seen: HashSet<PathBuf> = hits.iter().map(|h| h.path.clone()).collect();
            hits.extend(
                search_tree(archive.root(), &TokenPattern::new(short)?)
                    .into_iter()
                    .filter(|h| !seen.contains(&h.path)),
            );
        }
        Ok(absence_outcome(self.name(), "Hostname appears in files", hits))
    }
}

pub struct NoEmptyObfuscations;

impl Check for NoEmptyObfuscations {
    fn name(&self) -> &'static str {
        "no_empty_obfuscations"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        let Some(path) = ctx.mapping_path()? else {
            return Ok(CheckOutcome::fail(
                self.name(),
                "No mapping path found in stdout",
                Vec::new(),
            ));
        };
        let map = PrivateMap::load(&path)?;
        let violations = map.empty_entries();
        if violations.is_empty() {
            Ok(CheckOutcome::pass(
                self.name(),
                format!("{} entries across {} categories", map.len(), map.categories().count()),
            ))
        } else {
            Ok(CheckOutcome::fail(
                self.name(),
                format!("{} empty or malformed mapping entries", violations.len()),
                violations.iter().map(ToString::to_string).collect(),
            ))
        }
    }
}

pub struct IpNotInAnyFile;

impl Check for IpNotInAnyFile {
    fn name(&self) -> &'static str {
        "ip_not_in_any_file"
    }

    fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<CheckOutcome, VerifyError> {
        let archive = ctx.archive()?;
        let matcher = LiteralPattern::new(&ctx.snapshot.ip_addr)?;
        debug!("Searching archive for {}.", matcher.describe());
        let hits = search_tree(archive.root(), &matcher);
        Ok(absence_outcome(self.name(), "IP appears in files", hits))
    }
}

fn absence_outcome(name: &str, failure: &str, hits: Vec<ContentHit>) -> CheckOutcome {
    if hits.is_empty() {
        CheckOutcome::pass(name, "Not found in any file")
    } else {
        let evidence = hits.iter().map(ContentHit::summary).collect();
        CheckOutcome::fail(name, format!("{} ({} files)", failure, hits.len()), evidence)
    }
}

/// Runs checks in order and never stops early.
pub struct CheckRunner {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRunner {
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// The full clean scenario, in its fixed order.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(MarkerWritten),
            Box::new(PrivateMapWasGenerated),
            Box::new(TarballNamedObfuscated),
            Box::new(ArchiveTypeCorrect),
            Box::new(HostnameNotInAnyFile),
            Box::new(NoEmptyObfuscations),
            Box::new(IpNotInAnyFile),
        ])
    }

    pub fn run_all(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        self.checks
            .iter()
            .map(|check| {
                let outcome = check.evaluate(ctx).unwrap_or_else(|e| {
                    CheckOutcome::fail(check.name(), "Check could not be evaluated", vec![e.to_string()])
                });
                if outcome.passed {
                    info!("PASS {}: {}", outcome.name, outcome.message);
                } else {
                    warn!("FAIL {}: {}", outcome.name, outcome.message);
                }
                outcome
            })
            .collect()
    }
}
