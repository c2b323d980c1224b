//! Workflow runner entry point.
//!
//! Binary name: `workflow-run`
//!
//! Loads the config file, sets up logging, then runs, resets, lists or
//! cleans up the configured workflow. The exit code reports the outcome:
//! 0 success, 1 task failure, 2 fatal error, 130 interrupted.

mod cli;
mod report;
mod run;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use yawe_core::workflow::report::EXIT_FATAL;
use yawe_infra::config::load_engine_config;
use yawe_observe::tracing_setup::{TracingOptions, init_tracing, log_file_path, shutdown_tracing};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_engine_config(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            report::print_error(&e.to_string(), cli.json);
            return exit_code(EXIT_FATAL);
        }
    };

    let options = TracingOptions {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| config.logger.level.clone()),
        log_file: Some(log_file_path(
            Path::new(&config.logger.log_dir),
            &config.logger.log_name,
            chrono::Local::now().date_naive(),
        )),
        enable_otel: cli.otel,
    };
    if let Err(e) = init_tracing(&options) {
        report::print_error(&format!("failed to set up logging: {e}"), cli.json);
        return exit_code(EXIT_FATAL);
    }

    let code = match run::execute(cli.action(), &config, cli.json).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            report::print_error(&format!("{e:#}"), cli.json);
            EXIT_FATAL
        }
    };

    shutdown_tracing();
    exit_code(code)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
