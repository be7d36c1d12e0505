// cleancheck/src/main.rs
//! cleancheck entry point.
//!
//! Parses the command line, initialises logging and dispatches to the
//! command. Errors are printed once, here, and become exit code 2.

use clap::Parser;
use is_terminal::IsTerminal;
use log::debug;
use std::io;
use std::process::ExitCode;

use cleancheck::cli::{Cli, Commands};
use cleancheck::commands::{self, Verdict, SCENARIO_ERROR_EXIT};
use cleancheck::logger;
use cleancheck::report::print_error_message;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    logger::init_logger(logger::level_from_flags(args.quiet, args.debug));
    debug!("cleancheck {} started.", env!("CARGO_PKG_VERSION"));

    let result = match args.command {
        Commands::Run(cmd) => commands::run::run_run(cmd).await,
        Commands::Verify(cmd) => commands::verify::run_verify(cmd),
        Commands::ShowConfig { config } => {
            commands::show_config::run_show_config(config.as_deref()).map(|()| Verdict::Passed)
        }
    };

    match result {
        Ok(verdict) => verdict.exit_code(),
        Err(e) => {
            let stderr = io::stderr();
            let color = stderr.is_terminal();
            let _ = print_error_message(&mut stderr.lock(), &format!("{:#}", e), color);
            ExitCode::from(SCENARIO_ERROR_EXIT)
        }
    }
}
