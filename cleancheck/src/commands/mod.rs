// cleancheck/src/commands/mod.rs
//! Command implementations and the plumbing they share: scenario resolution
//! and report output.

pub mod run;
pub mod show_config;
pub mod verify;

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cleancheck_core::{ScenarioConfig, VerificationReport};

use crate::cli::{ReportArgs, SnapshotArgs};
use crate::report;

/// How a command ended, when it ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    ChecksFailed,
}

impl Verdict {
    pub fn of(report: &VerificationReport) -> Self {
        if report.passed() {
            Verdict::Passed
        } else {
            Verdict::ChecksFailed
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Verdict::Passed => ExitCode::SUCCESS,
            Verdict::ChecksFailed => ExitCode::from(1),
        }
    }
}

/// Exit code for anything that stopped the scenario itself.
pub const SCENARIO_ERROR_EXIT: u8 = 2;

/// `<config dir>/cleancheck/scenario.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cleancheck").join("scenario.yaml"))
}

/// Loads the scenario: the explicit file if given, else the default file if it
/// exists, else built-in defaults.
pub fn load_scenario(explicit: Option<&Path>) -> Result<ScenarioConfig> {
    if let Some(path) = explicit {
        return ScenarioConfig::load_from_file(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => ScenarioConfig::load_from_file(&path),
        _ => {
            debug!("No scenario file; using built-in defaults.");
            Ok(ScenarioConfig::default())
        }
    }
}

/// Flags win over the file.
pub fn apply_snapshot_overrides(config: &mut ScenarioConfig, args: &SnapshotArgs) {
    if let Some(hostname) = &args.hostname {
        config.hostname = Some(hostname.clone());
    }
    if let Some(ip) = &args.ip_addr {
        config.ip_addr = Some(ip.clone());
    }
}

/// Prints the report to the console (or JSON to stdout) and writes the JSON
/// file if one was requested.
pub fn emit_report(report: &VerificationReport, args: &ReportArgs) -> Result<()> {
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    if args.json_stdout {
        writeln!(out, "{}", report::to_json(report)?).context("Failed to write to stdout")?;
    } else {
        report::print_report(&mut out, report, color)?;
    }
    if let Some(path) = &args.json_file {
        report::write_json_file(report, path)?;
        info!("JSON report written to {}", path.display());
    }
    Ok(())
}
