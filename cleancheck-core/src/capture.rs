//! The once-captured result of the collaborator run and the facts parsed out
//! of its stdout.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::VerifyError;

lazy_static! {
    /// An absolute path to a tarball, optionally compressed.
    static ref TARBALL_PATH: Regex =
        Regex::new(r"(/[^\s'\x22]+\.(?:tar\.xz|tar\.gz|tgz|tar))\b").unwrap();
}

/// Text the collaborator prints right before the archive path.
const SAVED_IN: &str = "saved in:";

/// Stdout, stderr and exit status of one external process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCapture {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl CommandCapture {
    /// A capture reconstructed from a saved stdout, for offline verification.
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            status: Some(0),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// The last `max_lines` lines of stderr, for error messages.
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// The last path in `stdout` matching `pattern`.
pub fn find_mapping_path(stdout: &str, pattern: &str) -> Result<Option<PathBuf>, VerifyError> {
    let re = Regex::new(pattern).map_err(|e| VerifyError::Pattern(pattern.to_string(), e))?;
    Ok(re
        .find_iter(stdout)
        .last()
        .map(|m| PathBuf::from(m.as_str().trim())))
}

/// The archive the collaborator reported. Prefers the path following the
/// "saved in:" announcement, then the last tarball path anywhere in stdout.
pub fn find_archive_path(stdout: &str) -> Option<PathBuf> {
    let mut lines = stdout.lines();
    let mut announced = None;
    while let Some(line) = lines.next() {
        if let Some(idx) = line.find(SAVED_IN) {
            let rest = line[idx + SAVED_IN.len()..].trim();
            let candidate = if rest.is_empty() {
                lines.by_ref().map(str::trim).find(|l| !l.is_empty())
            } else {
                Some(rest)
            };
            if let Some(path) = candidate.filter(|p| p.starts_with('/')) {
                announced = Some(PathBuf::from(path));
            }
        }
    }
    announced.or_else(|| {
        TARBALL_PATH
            .captures_iter(stdout)
            .last()
            .and_then(|c| c.get(1))
            .map(|m| PathBuf::from(m.as_str()))
    })
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOS_STDOUT: &str = "\
sosreport (version 4.7.0)

Your sosreport has been generated and saved in:
\t/var/tmp/sosreport-obfuscatedhost0-2024-05-02-abcdef-obfuscated.tar.xz

 Size\t4.21MiB
 Owner\troot

A mapping of obfuscated elements is available at
\t/var/tmp/sosreport-host1-2024-05-02-abcdef-private_map

Please send this file to your support representative.
";

    #[test]
    fn archive_after_saved_in_line() {
        assert_eq!(
            find_archive_path(SOS_STDOUT),
            Some(PathBuf::from("/var/tmp/sosreport-obfuscatedhost0-2024-05-02-abcdef-obfuscated.tar.xz"))
        );
    }

    #[test]
    fn archive_fallback_to_last_tarball() {
        let out = "wrote /tmp/a.tar.gz\nthen /tmp/b-obfuscated.tar.gz done\n";
        assert_eq!(find_archive_path(out), Some(PathBuf::from("/tmp/b-obfuscated.tar.gz")));
    }

    #[test]
    fn no_archive_announced() {
        assert_eq!(find_archive_path("nothing to see"), None);
    }

    #[test]
    fn mapping_path_takes_last_match() -> Result<(), VerifyError> {
        let out = format!("{}\nA mapping ... at /tmp/sosreport-x-private_map\n", SOS_STDOUT);
        let found = find_mapping_path(&out, "/.*sosreport-.*-private_map")?;
        assert_eq!(found, Some(PathBuf::from("/tmp/sosreport-x-private_map")));
        Ok(())
    }

    #[test]
    fn stderr_tail_limits_lines() {
        let capture = CommandCapture {
            stderr: "a\nb\nc\nd".to_string(),
            ..Default::default()
        };
        assert_eq!(capture.stderr_tail(2), "c\nd");
    }
}
