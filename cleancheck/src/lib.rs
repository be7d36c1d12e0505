// cleancheck/src/lib.rs
//! # cleancheck CLI
//!
//! Terminal front end for `cleancheck-core`: argument parsing, scenario
//! resolution (file, default location, flags), logging setup and report
//! rendering. Exit codes are 0 when every check passed, 1 when any check
//! failed, and 2 when the scenario itself could not complete.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod report;
