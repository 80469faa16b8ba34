//! domgraft - DOM patch-engine plugin framework
//!
//! Main entry point for the domgraft CLI.

mod cli;
mod cmd_api;
mod cmd_demo;
mod cmd_plugins;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domgraft_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::{Cli, Commands};

/// Initialize tracing on stderr, plus daily rolling files when a log
/// directory is configured.
///
/// `RUST_LOG` wins over the configured level. The returned guard must live
/// until exit so buffered file output is flushed.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log level '{}'", logging.level))?,
    };

    let (file_writer, guard) = match &logging.directory {
        Some(dir) => {
            let dir = ConfigLoader::expand_path(&dir.to_string_lossy());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create log directory {}", dir))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("domgraft")
                .filename_suffix("log")
                .max_log_files(14)
                .build(&dir)
                .context("failed to create log file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let json = logging.json;
    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer, human-readable unless JSON is requested
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr).with_target(true)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        // File layer (no colors)
        .with(file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false)))
        .init();

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _guard = init_tracing(&config.logging)?;

    let warnings = ConfigValidator::validate(&config)
        .into_result()
        .context("invalid configuration")?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    debug!(base_url = %config.api.base_url, "Configuration loaded");

    match cli.command {
        Commands::Plugins { action } => cmd_plugins::handle_plugins_command(action, &config),
        Commands::Demo => cmd_demo::run_demo(&config).await,
        Commands::Account => {
            let facade = cmd_api::facade(&config.api)?;
            cmd_api::account(&facade, &cmd_api::cancel_on_ctrl_c()).await
        }
        Commands::RateLimits { scopes } => {
            let facade = cmd_api::facade(&config.api)?;
            cmd_api::rate_limits(&facade, scopes, &cmd_api::cancel_on_ctrl_c()).await
        }
        Commands::Models => {
            let facade = cmd_api::facade(&config.api)?;
            cmd_api::models(&facade, &cmd_api::cancel_on_ctrl_c()).await
        }
        Commands::Assets { action } => {
            let facade = cmd_api::facade(&config.api)?;
            cmd_api::handle_assets_command(&facade, action, &cmd_api::cancel_on_ctrl_c()).await
        }
    }
}
