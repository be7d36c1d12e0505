//! `cleancheck show-config`: the effective scenario, as YAML.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

use super::load_scenario;

pub fn run_show_config(config: Option<&Path>) -> Result<()> {
    let scenario = load_scenario(config)?;
    scenario.validate()?;
    let yaml = scenario.to_yaml()?;
    io::stdout()
        .write_all(yaml.as_bytes())
        .context("Failed to write to stdout")
}
