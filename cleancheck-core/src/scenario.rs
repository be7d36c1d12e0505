//! scenario.rs - The full clean scenario, end to end.
//!
//! [`run_scenario`] snapshots the system, stages files, plants the marker,
//! invokes the collaborator and hands the capture to [`verify_capture`], which
//! is also the entry point for re-verifying a saved run.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::archive::ReportArchive;
use crate::capture::{find_archive_path, find_mapping_path, CommandCapture};
use crate::checks::{CheckContext, CheckOutcome, CheckRunner, MarkerStatus};
use crate::config::ScenarioConfig;
use crate::errors::VerifyError;
use crate::invoke::run_collaborator;
use crate::journal::{write_marker, JournalSink, SystemdCat};
use crate::snapshot::SystemSnapshot;
use crate::staging::FileStager;

/// Everything known about one verified run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub started_at: DateTime<Utc>,
    /// Empty when verifying a saved capture.
    pub command_line: Vec<String>,
    pub duration_secs: f64,
    pub snapshot: SystemSnapshot,
    pub marker: MarkerStatus,
    pub archive: Option<PathBuf>,
    /// Set only when the unpacked tree was kept.
    pub extracted_root: Option<PathBuf>,
    pub mapping: Option<PathBuf>,
    pub outcomes: Vec<CheckOutcome>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }
}

/// Runs the collaborator per `config` and verifies the result.
///
/// `marker_sink` replaces the system journal for the setup line. Timeouts,
/// spawn failures and a non-zero exit are returned as errors; check failures
/// are in the report.
pub async fn run_scenario(
    config: &ScenarioConfig,
    marker_sink: Option<&mut dyn JournalSink>,
) -> Result<VerificationReport, VerifyError> {
    config
        .validate()
        .map_err(|e| VerifyError::InvalidConfig(format!("{:#}", e)))?;
    let started_at = Utc::now();
    let snapshot =
        SystemSnapshot::with_overrides(config.hostname.as_deref(), config.ip_addr.as_deref())?;

    let mut stager = FileStager::stage(&config.stage_files)?;
    if !stager.is_empty() {
        info!("Staged {} file(s) for the run.", stager.len());
    }

    let marker = if !config.write_marker {
        MarkerStatus::Disabled
    } else {
        match marker_sink {
            Some(sink) => plant_marker(sink, &snapshot.hostname),
            None => plant_marker(&mut SystemdCat::new(&config.journal_identifier), &snapshot.hostname),
        }
    };

    let argv = config.command_line();
    let result = run_collaborator(&argv, config.timeout()).await;
    stager.restore();
    let capture = result?;

    let mut report = verify_capture(config, &capture, None, snapshot, marker);
    report.started_at = started_at;
    report.command_line = argv;
    Ok(report)
}

fn plant_marker(sink: &mut dyn JournalSink, hostname: &str) -> MarkerStatus {
    match write_marker(sink, hostname) {
        Ok(()) => MarkerStatus::Written(sink.describe()),
        Err(e) => {
            warn!("Could not write hostname marker: {:#}", e);
            MarkerStatus::Failed(format!("{:#}", e))
        }
    }
}

/// Runs every check against an existing capture.
///
/// `archive_override` wins over the path announced in stdout.
pub fn verify_capture(
    config: &ScenarioConfig,
    capture: &CommandCapture,
    archive_override: Option<&Path>,
    snapshot: SystemSnapshot,
    marker: MarkerStatus,
) -> VerificationReport {
    let archive_path = archive_override
        .map(Path::to_path_buf)
        .or_else(|| find_archive_path(&capture.stdout));

    let opened: Result<ReportArchive, String> = match &archive_path {
        Some(path) => ReportArchive::open(path, config.tmp_dir.as_deref()).map_err(|e| e.to_string()),
        None => Err(VerifyError::ArchiveNotAnnounced.to_string()),
    };
    if let Err(why) = &opened {
        warn!("Archive checks will fail: {}", why);
    }

    let mapping = find_mapping_path(&capture.stdout, &config.mapping_path_pattern)
        .ok()
        .flatten();

    let outcomes = {
        let ctx = CheckContext {
            config,
            capture,
            snapshot: &snapshot,
            archive: opened.as_ref().map_err(Clone::clone),
            marker: &marker,
        };
        CheckRunner::standard().run_all(&ctx)
    };

    let extracted_root = match opened {
        Ok(archive) if config.keep_extracted => Some(archive.keep()),
        _ => None,
    };

    VerificationReport {
        started_at: Utc::now(),
        command_line: Vec::new(),
        duration_secs: capture.duration.as_secs_f64(),
        snapshot,
        marker,
        archive: archive_path,
        extracted_root,
        mapping,
        outcomes,
    }
}
