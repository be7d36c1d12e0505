// cleancheck/src/report.rs
//! Console and JSON rendering of a [`VerificationReport`].
//!
//! The console form is a PASS/FAIL table followed by the evidence for each
//! failed check. Colour is applied only when the caller says the target is a
//! terminal, so the same functions serve pipes, files and tests.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use owo_colors::OwoColorize;
use std::fs;
use std::io::Write;
use std::path::Path;

use cleancheck_core::{MarkerStatus, VerificationReport};

/// Evidence lines printed per failed check. The JSON report has all of them.
pub const MAX_EVIDENCE_LINES: usize = 10;

/// Builds the PASS/FAIL table.
pub fn outcome_table(report: &VerificationReport, color: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Check", "Result", "Details"]);
    if color {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }

    for outcome in &report.outcomes {
        let result = if outcome.passed {
            Cell::new("PASS").fg(Color::Green)
        } else {
            Cell::new("FAIL").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&outcome.name),
            result,
            Cell::new(&outcome.message),
        ]);
    }
    table
}

/// Writes the full console report: run header, table, evidence and verdict.
pub fn print_report<W: Write>(out: &mut W, report: &VerificationReport, color: bool) -> Result<()> {
    let snapshot = &report.snapshot;
    writeln!(out, "Host: {}  IP: {}", snapshot.hostname, snapshot.ip_addr)?;
    if !report.command_line.is_empty() {
        writeln!(out, "Command: {} ({:.1}s)", report.command_line.join(" "), report.duration_secs)?;
    }
    if let Some(archive) = &report.archive {
        writeln!(out, "Archive: {}", archive.display())?;
    }
    if let Some(mapping) = &report.mapping {
        writeln!(out, "Mapping: {}", mapping.display())?;
    }
    if let MarkerStatus::Written(sink) = &report.marker {
        writeln!(out, "Marker:  {}", sink)?;
    }
    writeln!(out, "{}", outcome_table(report, color))?;

    for outcome in report.failed() {
        let heading = format!("{}: {}", outcome.name, outcome.message);
        if color {
            writeln!(out, "{}", heading.red().bold())?;
        } else {
            writeln!(out, "{}", heading)?;
        }
        for line in outcome.evidence.iter().take(MAX_EVIDENCE_LINES) {
            writeln!(out, "    {}", line)?;
        }
        if outcome.evidence.len() > MAX_EVIDENCE_LINES {
            writeln!(out, "    ... and {} more", outcome.evidence.len() - MAX_EVIDENCE_LINES)?;
        }
    }

    if let Some(root) = &report.extracted_root {
        writeln!(out, "Unpacked archive kept at {}", root.display())?;
    }

    let total = report.outcomes.len();
    let failed = report.failed_count();
    let verdict = if failed == 0 {
        format!("All {} checks passed.", total)
    } else {
        format!("{} of {} checks failed.", failed, total)
    };
    match (color, failed == 0) {
        (true, true) => writeln!(out, "{}", verdict.green().bold())?,
        (true, false) => writeln!(out, "{}", verdict.red().bold())?,
        (false, _) => writeln!(out, "{}", verdict)?,
    }
    Ok(())
}

/// Serialises the report as pretty JSON.
pub fn to_json(report: &VerificationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize the report to JSON")
}

/// Writes the JSON report to `path`.
pub fn write_json_file(report: &VerificationReport, path: &Path) -> Result<()> {
    let json = to_json(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write JSON report to {}", path.display()))
}

/// Prints a one-line error to stderr, in red when stderr is a terminal.
pub fn print_error_message<W: Write>(out: &mut W, msg: &str, color: bool) -> std::io::Result<()> {
    if color {
        writeln!(out, "{} {}", "error:".red().bold(), msg)
    } else {
        writeln!(out, "error: {}", msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cleancheck_core::{CheckOutcome, SystemSnapshot};

    fn sample(outcomes: Vec<CheckOutcome>) -> VerificationReport {
        VerificationReport {
            started_at: Utc::now(),
            command_line: vec!["sos".into(), "report".into(), "--clean".into()],
            duration_secs: 12.5,
            snapshot: SystemSnapshot::new("host1.example.com", "10.0.0.5"),
            marker: MarkerStatus::Disabled,
            archive: Some("/var/tmp/sosreport-host0-obfuscated.tar.xz".into()),
            extracted_root: None,
            mapping: None,
            outcomes,
        }
    }

    fn render(report: &VerificationReport) -> String {
        let mut buf = Vec::new();
        print_report(&mut buf, report, false).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn passing_report_has_verdict_and_no_evidence() {
        let report = sample(vec![CheckOutcome::pass("tarball_named_obfuscated", "ok")]);
        let text = render(&report);
        assert!(text.contains("tarball_named_obfuscated"));
        assert!(text.contains("PASS"));
        assert!(text.contains("All 1 checks passed."));
        assert!(text.contains("sos report --clean"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn evidence_is_capped_on_console() {
        let evidence: Vec<String> = (0..15).map(|i| format!("file{}:1: host1", i)).collect();
        let report = sample(vec![CheckOutcome::fail(
            "hostname_not_in_any_file",
            "Hostname found in 15 file(s)",
            evidence,
        )]);
        let text = render(&report);
        assert!(text.contains("file9:1: host1"));
        assert!(!text.contains("file10:1: host1"));
        assert!(text.contains("... and 5 more"));
        assert!(text.contains("1 of 1 checks failed."));
    }

    #[test]
    fn json_keeps_all_evidence() {
        let evidence: Vec<String> = (0..15).map(|i| format!("e{}", i)).collect();
        let report = sample(vec![CheckOutcome::fail("ip_not_in_any_file", "leak", evidence)]);
        let value: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
        assert_eq!(value["outcomes"][0]["evidence"].as_array().unwrap().len(), 15);
        assert_eq!(value["snapshot"]["ip_addr"], "10.0.0.5");
    }
}
