//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Applies `--home` and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use eec_config::{CliOverrides, Config};
use eec_utils::error::EecError;
use eec_utils::exit_codes::ExitCode;
use eec_utils::logging::init_tracing;
use eec_utils::paths::HOME_ENV_VAR;

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())` after printing any output
/// - On error: prints the user-facing report, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Some(home) = &cli.home {
        // SAFETY: no other thread exists yet; the runtime is created below.
        unsafe { std::env::set_var(HOME_ENV_VAR, home) };
    }

    if let Err(e) = init_tracing(cli.verbose, cli.log_json) {
        eprintln!("✗ Failed to initialize logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        poll_interval_secs: cli.poll_interval,
        store_backend: cli.store.map(Into::into),
        store_path: cli.store_path.clone(),
    };

    let config = match Config::discover(&overrides) {
        Ok(config) => config,
        Err(err) => return Err(report(&EecError::Config(err), cli.json)),
    };
    tracing::debug!(source = ?config.source, "Configuration loaded");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let json = cli.json;
    let result = rt.block_on(async {
        match cli.command {
            Commands::Serve { force } => commands::execute_serve_command(&config, force).await,
            Commands::Submit {
                artefact,
                inputs,
                id,
                detach,
            } => {
                let request = commands::SubmitRequest {
                    artefact,
                    inputs,
                    id,
                    detach,
                };
                commands::execute_submit_command(&config, request, json).await
            }
            Commands::Status { id } => commands::execute_status_command(&config, &id, json).await,
            Commands::Usage { id } => commands::execute_usage_command(&config, &id, json).await,
            Commands::Abort { id } => commands::execute_abort_command(&config, &id, json).await,
            Commands::List => commands::execute_list_command(&config, json).await,
            Commands::Inputs { artefact } => {
                commands::execute_inputs_command(&config, &artefact, json)
            }
        }
    });

    result.map_err(|err| report(&err, json))
}

/// Print the error and pick the exit code.
fn report(err: &EecError, json: bool) -> ExitCode {
    let code = err.to_exit_code();
    if json {
        commands::emit_error_json(err, code);
    } else {
        eprint!("{}", err.display_for_user());
    }
    code
}
