// cleancheck/src/logger.rs
//! Logger setup for the `cleancheck` binary.
//!
//! Logs go to stderr so that stdout stays free for the report (and for
//! `--json-stdout`). `RUST_LOG` is honoured unless a level is forced.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initialises `env_logger` once. Later calls are ignored.
///
/// `level` overrides `RUST_LOG` when given; otherwise the default is `warn`.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder
        .format_timestamp(None)
        .format_target(true)
        .target(env_logger::Target::Stderr);
    let _ = builder.try_init();
}

/// Maps the global flags to a forced level. `--quiet` wins over `--debug`.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}
