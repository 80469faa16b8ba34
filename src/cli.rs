//! CLI definitions for domgraft.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// domgraft CLI.
#[derive(Parser)]
#[command(name = "domgraft")]
#[command(about = "Plugin framework that grafts isolated UI fragments onto a live document")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: <config dir>/domgraft/domgraft.toml)
    #[arg(short, long, global = true, env = "DOMGRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true, env = "DOMGRAFT_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Plugin management commands
    Plugins {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// Show the current user's profile and subscriptions
    Account,

    /// Show API rate limits
    RateLimits {
        /// Only these scopes (default: all)
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },

    /// List available models
    Models,

    /// Asset commands
    Assets {
        #[command(subcommand)]
        action: AssetAction,
    },

    /// Run the built-in plugins against a simulated host page
    Demo,
}

#[derive(Subcommand)]
pub(crate) enum PluginAction {
    /// List registered plugins
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Enable a plugin
    Enable {
        /// Plugin name
        name: String,
    },

    /// Disable a plugin
    Disable {
        /// Plugin name
        name: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum AssetAction {
    /// List every asset, following pagination
    List {
        /// Filter by asset kind
        #[arg(long)]
        kind: Option<String>,

        /// Free-text search
        #[arg(long)]
        search: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete assets in concurrent batches
    Delete {
        /// Asset ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Deletes in flight at once (default: from config)
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}
