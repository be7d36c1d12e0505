//! Setup step: plant the hostname in the system journal before collection.
//!
//! The marker line carries the full and short hostname in both lower and upper
//! case, so the collaborator's case-insensitive matching is exercised on data
//! it is guaranteed to collect.

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::snapshot::short_name;

/// Builds the marker line for `hostname`.
pub fn marker_line(hostname: &str) -> String {
    let short = short_name(hostname);
    format!(
        "This is a test line from sos clean testing. The hostname {} should not appear, \
         nor should {} in an obfuscated archive. The shortnames of {} and {} should also not appear.",
        hostname.to_lowercase(),
        hostname.to_uppercase(),
        short.to_lowercase(),
        short.to_uppercase()
    )
}

/// Destination for the marker line.
pub trait JournalSink {
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Human-readable name for logs and reports.
    fn describe(&self) -> String;
}

/// Writes to the systemd journal through `systemd-cat -t <identifier>`.
pub struct SystemdCat {
    identifier: String,
    program: String,
}

impl SystemdCat {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            program: "systemd-cat".to_string(),
        }
    }

    /// Uses a different executable with the same `-t <identifier>` contract.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl JournalSink for SystemdCat {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg("-t")
            .arg(&self.identifier)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| anyhow!("{} stdin unavailable", self.program))?;
            writeln!(stdin, "{}", line).context("Failed to write marker line")?;
        }
        // Closing stdin lets systemd-cat flush and exit.
        drop(child.stdin.take());

        let status = child.wait().context("Failed to wait for journal writer")?;
        if !status.success() {
            return Err(anyhow!("{} exited with {}", self.program, status));
        }
        debug!("Marker line sent to journal as '{}'.", self.identifier);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("journal ({} -t {})", self.program, self.identifier)
    }
}

/// Appends the marker to a plain file.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl JournalSink for FileSink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open marker file {}", self.path.display()))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file ({})", self.path.display())
    }
}

/// Writes the marker for `hostname` to `sink`.
pub fn write_marker(sink: &mut dyn JournalSink, hostname: &str) -> Result<()> {
    let line = marker_line(hostname);
    sink.write_line(&line)?;
    info!("Wrote hostname marker to {}.", sink.describe());
    Ok(())
}
