//! Plugin subcommand handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use domgraft_config::{Config, FileSettingsStore};
use domgraft_core::{PatchEngine, PluginInfo, PluginRegistry};
use domgraft_dom::MemoryDocument;
use domgraft_plugins::builtin_plugins;

use crate::cli::{OutputFormat, PluginAction};

/// Handle plugin subcommands.
pub(crate) fn handle_plugins_command(action: PluginAction, config: &Config) -> Result<()> {
    let registry = open_registry(config)?;
    match action {
        PluginAction::List { format } => {
            print_plugins(&registry.list(), format)?;
        }
        PluginAction::Enable { name } => {
            registry
                .set_enabled(&name, true)
                .with_context(|| format!("failed to enable plugin '{}'", name))?;
            println!("Enabled {}", name);
        }
        PluginAction::Disable { name } => {
            registry
                .set_enabled(&name, false)
                .with_context(|| format!("failed to disable plugin '{}'", name))?;
            println!("Disabled {}", name);
        }
    }
    Ok(())
}

/// Registry of the built-in plugins over the persisted settings.
///
/// Management commands never start the registry; only flags change.
pub(crate) fn open_registry(config: &Config) -> Result<PluginRegistry> {
    let path = config.storage.resolved_path();
    let store = FileSettingsStore::open(&path)
        .with_context(|| format!("failed to open settings at {}", path.display()))?;
    info!(path = %path.display(), "Settings opened");

    let document = Arc::new(MemoryDocument::new().with_max_flush_rounds(config.engine.max_flush_rounds));
    let registry = PluginRegistry::new(PatchEngine::new(document.clone(), document), Arc::new(store));
    for err in registry.register_all(builtin_plugins(&config.engine)) {
        warn!("Skipping plugin: {}", err);
    }
    Ok(registry)
}

fn print_plugins(plugins: &[PluginInfo], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plugins)?);
        }
        OutputFormat::Table => {
            if plugins.is_empty() {
                println!("No plugins registered.");
                return Ok(());
            }
            println!("{:<20} {:<9} {:<13} {}", "NAME", "ENABLED", "CATEGORY", "DESCRIPTION");
            println!("{}", "-".repeat(80));
            for plugin in plugins {
                println!(
                    "{:<20} {:<9} {:<13} {}",
                    plugin.name,
                    if plugin.enabled { "yes" } else { "no" },
                    plugin.category.to_string(),
                    plugin.description
                );
            }
        }
    }
    Ok(())
}
