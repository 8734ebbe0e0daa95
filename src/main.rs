//! stepcheck - evaluation and repair loop for interactive lesson components
//!
//! Main entry point for the stepcheck CLI.

mod cli;
mod cmd_evaluate;
mod cmd_results;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stepcheck_config::{Config, ConfigError, ConfigLoader, ConfigValidator};

use cli::{Cli, Commands};
use cmd_evaluate::EvaluateOverrides;

/// Initialize tracing with console output and a daily log file under
/// `{results_dir}/logs`.
fn init_tracing(results_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = results_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("stepcheck")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer for the life of the process.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
        )
        .init();

    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<Config, ConfigError> {
    ConfigLoader::load_or_default(path)
}

/// Log warnings and turn the first validation error into a `ConfigError`.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        warn!("Config warning: {}: {}", warning.path, warning.message);
    }
    if let Some(first) = result.errors.first() {
        for e in &result.errors {
            error!("Config error: {}", e);
        }
        return Err(ConfigError::InvalidValue {
            field: first.path.clone(),
            message: first.message.clone(),
        });
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(work_dir) = &cli.work_dir {
        std::env::set_current_dir(work_dir)?;
    }

    let mut config = load_config(&cli.config)?;
    init_tracing(&config.paths.results_dir)?;

    match cli.command {
        Commands::Evaluate {
            module_id,
            headless,
            max_attempts,
            no_fix,
        } => {
            EvaluateOverrides {
                headless,
                max_attempts,
                no_fix,
            }
            .apply(&mut config);
            validate_config(&config)?;

            let all_passed = cmd_evaluate::evaluate(&module_id, config).await?;
            Ok(if all_passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Report { module_id } => {
            cmd_results::report(&module_id, config.paths).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reset { module_id } => {
            cmd_results::reset(&module_id, config.paths).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
