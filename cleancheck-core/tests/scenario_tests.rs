// cleancheck-core/tests/scenario_tests.rs
//! End-to-end scenario tests against a scripted stand-in for the collaborator.
//!
//! The stand-in is a small `sh` script that behaves like a clean run: it writes an
//! archive (directory or gzip tarball), a private mapping and the usual stdout
//! announcements. Variants of the script leak the hostname or the IP, print
//! nothing useful, or hang, to exercise each failure path.

#![cfg(unix)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

use cleancheck_core::{
    run_scenario, verify_capture, CommandCapture, FileSink, JournalSink, MarkerStatus,
    ScenarioConfig, StagedFile, SystemSnapshot, VerifyError,
};

const HOST: &str = "Host1.Example.com";
const IP: &str = "10.20.30.40";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: tempdir().expect("tempdir") }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a stand-in collaborator. `body` runs after `$OUT` is set up and
    /// before the stdout announcements.
    fn script(&self, body: &str, tarball: bool) -> PathBuf {
        let out = self.path().join("out");
        let report = "sosreport-obfuscatedhost0-2024-05-02-abcdef";
        let archive_line = if tarball {
            format!(
                "tar -czf \"$OUT/{r}-obfuscated.tar.gz\" -C \"$OUT\" {r}\n\
                 ARCHIVE=\"$OUT/{r}-obfuscated.tar.gz\"",
                r = report
            )
        } else {
            format!("mv \"$OUT/{r}\" \"$OUT/{r}-obfuscated\"\nARCHIVE=\"$OUT/{r}-obfuscated\"", r = report)
        };
        let script = format!(
            r#"#!/bin/sh
OUT="{out}"
mkdir -p "$OUT/{report}/sos_logs" "$OUT/{report}/etc"
echo "Loaded $OUT/{report} as type sos report directory" > "$OUT/{report}/sos_logs/sos.log"
echo "127.0.0.1 localhost" > "$OUT/{report}/etc/hosts"
echo "100.0.0.1 host0.obfuscateddomain0.com host0" >> "$OUT/{report}/etc/hosts"
cat > "$OUT/sosreport-host1-2024-05-02-abcdef-private_map" <<'JSON'
{{"hostname_map": {{"host1.example.com": "host0.obfuscateddomain0.com"}}, "ip_map": {{"10.20.30.40": "100.0.0.1"}}}}
JSON
{body}
{archive_line}
echo "Your sosreport has been generated and saved in:"
echo "	$ARCHIVE"
echo ""
echo "A mapping of obfuscated elements is available at"
echo "	$OUT/sosreport-host1-2024-05-02-abcdef-private_map"
"#,
            out = out.display(),
            report = report,
            body = body,
            archive_line = archive_line,
        );
        let path = self.path().join("fake-sos.sh");
        fs::write(&path, script).expect("write script");
        path
    }

    fn config(&self, script: &Path) -> ScenarioConfig {
        ScenarioConfig {
            command: "sh".to_string(),
            subcommand_args: vec![script.display().to_string()],
            timeout_secs: 30,
            hostname: Some(HOST.to_string()),
            ip_addr: Some(IP.to_string()),
            stage_files: vec![StagedFile {
                source: None,
                dest: self.path().join("cleaner/default_mapping"),
            }],
            ..Default::default()
        }
    }
}

#[test_log::test(tokio::test)]
async fn clean_run_passes_every_check() -> Result<()> {
    let ws = Workspace::new();
    let script = ws.script("", false);
    let config = ws.config(&script);
    let marker_path = ws.path().join("journal.log");
    let mut sink = FileSink::new(&marker_path);

    let report = run_scenario(&config, Some(&mut sink as &mut dyn JournalSink)).await?;

    for outcome in &report.outcomes {
        assert!(outcome.passed, "{} failed: {} {:?}", outcome.name, outcome.message, outcome.evidence);
    }
    assert!(report.passed());
    assert_eq!(report.outcomes.len(), 7);
    assert_eq!(report.command_line[0], "sh");
    assert!(report.command_line.contains(&"--clean".to_string()));
    assert!(matches!(report.marker, MarkerStatus::Written(_)));

    let marker = fs::read_to_string(&marker_path)?;
    assert!(marker.contains("HOST1.EXAMPLE.COM"));
    // The staged placeholder did not exist before, so it is gone again.
    assert!(!ws.path().join("cleaner/default_mapping").exists());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn gzip_tarball_is_unpacked_and_checked() -> Result<()> {
    let ws = Workspace::new();
    let script = ws.script("", true);
    let mut config = ws.config(&script);
    config.write_marker = false;

    let report = run_scenario(&config, None).await?;
    assert!(report.passed(), "{:#?}", report.outcomes);
    assert!(report
        .archive
        .as_ref()
        .is_some_and(|p| p.to_string_lossy().ends_with("-obfuscated.tar.gz")));
    assert_eq!(report.marker, MarkerStatus::Disabled);
    Ok(())
}

/// Builds the xz tarball `sos` normally produces, for a stand-in to "emit".
fn write_xz_report(path: &Path, report: &str) -> Result<()> {
    let enc = xz2::write::XzEncoder::new(fs::File::create(path)?, 6);
    let mut builder = tar::Builder::new(enc);
    for (name, data) in [
        ("sos_logs/sos.log", format!("Loaded /var/tmp/{} as type sos report directory\n", report)),
        ("etc/hosts", "100.0.0.1 host0.obfuscateddomain0.com host0\n".to_string()),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, format!("{}/{}", report, name), data.as_bytes())?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn xz_tarball_is_unpacked_and_kept_on_request() -> Result<()> {
    let ws = Workspace::new();
    let report = "sosreport-obfuscatedhost0-2024-05-02-abcdef";
    let prebuilt = ws.path().join("prebuilt.tar.xz");
    write_xz_report(&prebuilt, report)?;

    let out = ws.path().join("out");
    let script = format!(
        r#"#!/bin/sh
OUT="{out}"
mkdir -p "$OUT"
cp "{prebuilt}" "$OUT/{report}-obfuscated.tar.xz"
echo '{{"hostname_map": {{"host1.example.com": "host0.obfuscateddomain0.com"}}}}' > "$OUT/sosreport-host1-2024-05-02-abcdef-private_map"
echo "Your sosreport has been generated and saved in:"
echo "	$OUT/{report}-obfuscated.tar.xz"
echo ""
echo "A mapping of obfuscated elements is available at"
echo "	$OUT/sosreport-host1-2024-05-02-abcdef-private_map"
"#,
        out = out.display(),
        prebuilt = prebuilt.display(),
        report = report,
    );
    let script_path = ws.path().join("fake-sos-xz.sh");
    fs::write(&script_path, script)?;

    let mut config = ws.config(&script_path);
    config.write_marker = false;
    config.keep_extracted = true;
    config.tmp_dir = Some(ws.path().to_path_buf());

    let report_out = run_scenario(&config, None).await?;
    assert!(report_out.passed(), "{:#?}", report_out.outcomes);
    assert!(report_out
        .archive
        .as_ref()
        .is_some_and(|p| p.to_string_lossy().ends_with("-obfuscated.tar.xz")));
    let kept = report_out.extracted_root.expect("kept root");
    assert!(kept.ends_with(report));
    assert!(kept.join("sos_logs/sos.log").is_file());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn leaked_short_hostname_in_any_case_is_reported() -> Result<()> {
    let ws = Workspace::new();
    let body = r#"echo "kernel: eth0 up on HOST1" > "$OUT/sosreport-obfuscatedhost0-2024-05-02-abcdef/dmesg""#;
    let script = ws.script(body, false);
    let mut config = ws.config(&script);
    config.write_marker = false;

    let report = run_scenario(&config, None).await?;
    let failed: Vec<&str> = report.failed().map(|o| o.name.as_str()).collect();
    assert_eq!(failed, vec!["hostname_not_in_any_file"]);
    let outcome = report.failed().next().unwrap();
    assert_eq!(outcome.evidence, vec!["dmesg:1: kernel: eth0 up on HOST1".to_string()]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn leaked_ip_and_empty_mapping_fail_independently() -> Result<()> {
    let ws = Workspace::new();
    let body = r#"echo "inet 10.20.30.40/24" > "$OUT/sosreport-obfuscatedhost0-2024-05-02-abcdef/ip_addr""#;
    let script = ws.script(body, false);
    // Replace the mapping after the script has written its own.
    let mut text = fs::read_to_string(&script)?;
    text.push_str(&format!(
        "echo '{{\"ip_map\": {{\"10.20.30.40\": \"\"}}}}' > \"{}/out/sosreport-host1-2024-05-02-abcdef-private_map\"\n",
        ws.path().display()
    ));
    fs::write(&script, text)?;
    let mut config = ws.config(&script);
    config.write_marker = false;

    let report = run_scenario(&config, None).await?;
    let failed: Vec<&str> = report.failed().map(|o| o.name.as_str()).collect();
    assert_eq!(failed, vec!["no_empty_obfuscations", "ip_not_in_any_file"]);
    assert_eq!(report.failed_count(), 2);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn hanging_collaborator_times_out() {
    let ws = Workspace::new();
    let script = ws.script("sleep 10", false);
    let mut config = ws.config(&script);
    config.write_marker = false;
    config.timeout_secs = 1;

    let err = run_scenario(&config, None).await.unwrap_err();
    assert!(matches!(err, VerifyError::Timeout { timeout, .. } if timeout == Duration::from_secs(1)));
    // Staged files are restored even on a hard failure.
    assert!(!ws.path().join("cleaner/default_mapping").exists());
}

#[test_log::test(tokio::test)]
async fn failing_collaborator_is_a_run_error() {
    let ws = Workspace::new();
    let script = ws.script("echo 'policy error' >&2; exit 1", false);
    let mut config = ws.config(&script);
    config.write_marker = false;

    let err = run_scenario(&config, None).await.unwrap_err();
    assert!(err.is_run_failure());
    assert!(err.to_string().contains("policy error"));
}

#[test]
fn offline_verify_without_archive_fails_archive_checks_only() -> Result<()> {
    let ws = Workspace::new();
    let map = ws.path().join("sosreport-host1-private_map");
    fs::write(&map, r#"{"hostname_map": {"host1": "host0"}}"#)?;
    let capture = CommandCapture::from_stdout(format!(
        "A mapping of obfuscated elements is available at\n\t{}\n",
        map.display()
    ));

    let report = verify_capture(
        &ScenarioConfig::default(),
        &capture,
        None,
        SystemSnapshot::new(HOST, IP),
        MarkerStatus::Disabled,
    );
    let failed: Vec<&str> = report.failed().map(|o| o.name.as_str()).collect();
    assert_eq!(
        failed,
        vec![
            "tarball_named_obfuscated",
            "archive_type_correct",
            "hostname_not_in_any_file",
            "ip_not_in_any_file"
        ]
    );
    assert_eq!(report.mapping.as_deref(), Some(map.as_path()));
    Ok(())
}
