// cleancheck/src/cli.rs
//! Command-line interface for `cleancheck`: the commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "cleancheck",
    version = env!("CARGO_PKG_VERSION"),
    about = "Run an obfuscation tool in clean mode and verify the result",
    long_about = "cleancheck runs an obfuscation tool (sos by default) with its clean flag, then checks that the output archive is marked as obfuscated, that a private mapping was produced with no empty substitutions, and that neither the hostname nor the IP address of this machine survived in any file.",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all log output.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the collaborator with its clean flag and verifies the output.
    #[command(about = "Run the collaborator in clean mode and verify the output.")]
    Run(RunCommand),

    /// Verifies the output of an earlier run from its saved stdout.
    #[command(about = "Verify a previous run from its saved stdout.")]
    Verify(VerifyCommand),

    /// Prints the effective scenario configuration as YAML.
    #[command(about = "Print the effective scenario configuration as YAML.")]
    ShowConfig {
        /// Path to a scenario file (YAML).
        #[arg(long = "config", value_name = "FILE", env = "CLEANCHECK_CONFIG", help = "Path to a scenario file (YAML).")]
        config: Option<PathBuf>,
    },
}

/// Where the report goes besides the console.
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Write the report as JSON to this file.
    #[arg(long = "json-file", value_name = "FILE", help = "Write the report as JSON to a file.")]
    pub json_file: Option<PathBuf>,

    /// Print the report as JSON to stdout instead of the table.
    #[arg(long = "json-stdout", conflicts_with = "json_file", help = "Print the report as JSON to stdout instead of the table.")]
    pub json_stdout: bool,
}

/// Snapshot overrides shared by `run` and `verify`.
#[derive(Args, Debug, Clone, Default)]
pub struct SnapshotArgs {
    /// Hostname that must not survive the clean.
    #[arg(long = "hostname", value_name = "NAME", help = "Hostname that must not survive (default: this machine's).")]
    pub hostname: Option<String>,

    /// IP address that must not survive the clean.
    #[arg(long = "ip-addr", value_name = "IP", help = "IP address that must not survive (default: the hostname's address).")]
    pub ip_addr: Option<String>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunCommand {
    /// Path to a scenario file (YAML).
    #[arg(long = "config", value_name = "FILE", env = "CLEANCHECK_CONFIG", help = "Path to a scenario file (YAML).")]
    pub config: Option<PathBuf>,

    /// Collaborator executable.
    #[arg(long = "command", value_name = "BIN", help = "Collaborator executable (default: sos).")]
    pub command: Option<String>,

    /// Timeout for the collaborator, in seconds.
    #[arg(long = "timeout", value_name = "SECS", help = "Kill the collaborator after this many seconds.")]
    pub timeout: Option<u64>,

    /// Directory handed to the collaborator as `--tmp-dir`.
    #[arg(long = "tmp-dir", value_name = "DIR", help = "Directory for the collaborator's output and for unpacking.")]
    pub tmp_dir: Option<PathBuf>,

    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Skip the journal marker.
    #[arg(long = "no-marker", help = "Do not write the hostname marker to the journal.")]
    pub no_marker: bool,

    /// Append the marker to a file instead of the journal.
    #[arg(long = "marker-file", value_name = "FILE", conflicts_with = "no_marker", help = "Append the hostname marker to a file instead of the journal.")]
    pub marker_file: Option<PathBuf>,

    /// Keep the unpacked archive.
    #[arg(long = "keep-extracted", help = "Keep the unpacked archive and print its location.")]
    pub keep_extracted: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Arguments for the `verify` command.
#[derive(Parser, Debug)]
pub struct VerifyCommand {
    /// Saved stdout of an earlier clean run.
    #[arg(long = "stdout-file", value_name = "FILE", help = "Saved stdout of an earlier clean run.")]
    pub stdout_file: PathBuf,

    /// Archive to check instead of the one announced in stdout.
    #[arg(long = "archive", value_name = "PATH", help = "Archive to check instead of the one announced in stdout.")]
    pub archive: Option<PathBuf>,

    /// Path to a scenario file (YAML).
    #[arg(long = "config", value_name = "FILE", env = "CLEANCHECK_CONFIG", help = "Path to a scenario file (YAML).")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Keep the unpacked archive.
    #[arg(long = "keep-extracted", help = "Keep the unpacked archive and print its location.")]
    pub keep_extracted: bool,

    #[command(flatten)]
    pub report: ReportArgs,
}
