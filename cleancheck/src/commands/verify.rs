//! `cleancheck verify`: re-run the checks against a saved stdout and the
//! archive it announces (or one given explicitly).
//!
//! No collaborator is invoked and no marker is written, so the marker check
//! reports itself as disabled.

use anyhow::{Context, Result};
use log::info;
use std::fs;

use cleancheck_core::{verify_capture, CommandCapture, MarkerStatus, SystemSnapshot};

use super::{apply_snapshot_overrides, emit_report, load_scenario, Verdict};
use crate::cli::VerifyCommand;

pub fn run_verify(cmd: VerifyCommand) -> Result<Verdict> {
    let mut config = load_scenario(cmd.config.as_deref())?;
    apply_snapshot_overrides(&mut config, &cmd.snapshot);
    if cmd.keep_extracted {
        config.keep_extracted = true;
    }
    config.validate()?;

    let stdout = fs::read_to_string(&cmd.stdout_file)
        .with_context(|| format!("Failed to read saved stdout from {}", cmd.stdout_file.display()))?;
    let capture = CommandCapture::from_stdout(stdout);
    let snapshot =
        SystemSnapshot::with_overrides(config.hostname.as_deref(), config.ip_addr.as_deref())
            .context("Could not determine the hostname and IP to look for")?;

    info!("Verifying saved run from {}", cmd.stdout_file.display());
    let report = verify_capture(
        &config,
        &capture,
        cmd.archive.as_deref(),
        snapshot,
        MarkerStatus::Disabled,
    );

    emit_report(&report, &cmd.report)?;
    Ok(Verdict::of(&report))
}
