//! `cleancheck run`: invoke the collaborator in clean mode, then verify.

use anyhow::{Context, Result};
use log::info;

use cleancheck_core::{run_scenario, FileSink, JournalSink, ScenarioConfig};

use super::{apply_snapshot_overrides, emit_report, load_scenario, Verdict};
use crate::cli::RunCommand;

/// Scenario from file plus the flags of `run`.
pub fn resolve_config(cmd: &RunCommand) -> Result<ScenarioConfig> {
    let mut config = load_scenario(cmd.config.as_deref())?;
    if let Some(command) = &cmd.command {
        config.command = command.clone();
    }
    if let Some(secs) = cmd.timeout {
        config.timeout_secs = secs;
    }
    if let Some(dir) = &cmd.tmp_dir {
        config.tmp_dir = Some(dir.clone());
    }
    if cmd.no_marker {
        config.write_marker = false;
    }
    if cmd.keep_extracted {
        config.keep_extracted = true;
    }
    apply_snapshot_overrides(&mut config, &cmd.snapshot);
    config.validate()?;
    Ok(config)
}

pub async fn run_run(cmd: RunCommand) -> Result<Verdict> {
    let config = resolve_config(&cmd)?;
    info!("Running: {}", config.command_line().join(" "));

    let report = match &cmd.marker_file {
        Some(path) => {
            let mut sink = FileSink::new(path);
            run_scenario(&config, Some(&mut sink as &mut dyn JournalSink)).await
        }
        None => run_scenario(&config, None).await,
    }
    .with_context(|| format!("Clean run of '{}' did not complete", config.command))?;

    emit_report(&report, &cmd.report)?;
    Ok(Verdict::of(&report))
}
