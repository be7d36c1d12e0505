//! Runs the collaborator once, bounded by a timeout.

use log::{debug, info, warn};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use crate::capture::CommandCapture;
use crate::errors::VerifyError;

/// Lines of stderr carried in a [`VerifyError::CollaboratorFailed`].
const STDERR_TAIL_LINES: usize = 20;

/// Spawns `argv[0]` with the remaining arguments and waits at most
/// `timeout_duration`. The child is killed if the deadline passes.
pub async fn run_collaborator(
    argv: &[String],
    timeout_duration: Duration,
) -> Result<CommandCapture, VerifyError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| VerifyError::InvalidConfig("empty command line".to_string()))?;
    let display = argv.join(" ");
    info!("Running '{}' (timeout {}s).", display, timeout_duration.as_secs());

    let mut command = Command::new(program);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);

    let child = command.spawn().map_err(|source| VerifyError::Spawn {
        command: display.clone(),
        source,
    })?;

    let started = Instant::now();
    let output = match timeout(timeout_duration, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("'{}' exceeded its {}s budget and was killed.", display, timeout_duration.as_secs());
            return Err(VerifyError::Timeout {
                command: display,
                timeout: timeout_duration,
            });
        }
    };

    let capture = CommandCapture {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status.code(),
        duration: started.elapsed(),
    };
    debug!(
        "'{}' finished in {:.1}s with status {:?} ({} bytes stdout).",
        display,
        capture.duration.as_secs_f64(),
        capture.status,
        capture.stdout.len()
    );

    if !capture.success() {
        return Err(VerifyError::CollaboratorFailed {
            command: display,
            status: capture
                .status
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr_tail: capture.stderr_tail(STDERR_TAIL_LINES),
        });
    }
    Ok(capture)
}
