//! strata CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Template error
//! - 5: Resolution error (unknown cluster or environment)

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const RESOLUTION_ERROR: u8 = 5;
}

fn main() -> ExitCode {
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive("strata=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::New(args) => commands::new::execute(args),
        Commands::Get(args) => commands::get::execute(args),
        Commands::Edit(args) => commands::edit::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Map concrete error types to exit codes.
fn categorize_error(e: &anyhow::Error) -> u8 {
    use strata_core::CoreError;
    use strata_templates::TemplateError;

    if let Some(core) = e.downcast_ref::<CoreError>() {
        return categorize_core(core);
    }

    if let Some(template) = e.downcast_ref::<TemplateError>() {
        return match template {
            TemplateError::Core(core) => categorize_core(core),
            _ => ExitCodes::TEMPLATE_ERROR,
        };
    }

    ExitCodes::GENERAL_ERROR
}

fn categorize_core(e: &strata_core::CoreError) -> u8 {
    use strata_core::CoreError;

    match e {
        CoreError::NoSuchCluster(_) | CoreError::NoSuchEnvironment(_) => {
            ExitCodes::RESOLUTION_ERROR
        }
        CoreError::UnknownMergePolicy(_)
        | CoreError::InvalidName { .. }
        | CoreError::InvalidOverride(_) => ExitCodes::INVALID_ARGS,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
