//! Handlers for the commands that talk to the service.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use domgraft_api::{ApiClient, ApiFacade, AssetFilters, RateLimitRequest};
use domgraft_config::ApiConfig;

use crate::cli::{AssetAction, OutputFormat};

/// Facade over the HTTP client for `config`.
pub(crate) fn facade(config: &ApiConfig) -> Result<ApiFacade> {
    let client = ApiClient::from_config(config)
        .with_context(|| format!("invalid API configuration for {}", config.base_url))?;
    Ok(ApiFacade::with_config(Arc::new(client), config))
}

/// Token cancelled on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling");
                trigger.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
    token
}

pub(crate) async fn account(facade: &ApiFacade, cancel: &CancellationToken) -> Result<()> {
    let overview = facade.account_overview(Some(cancel)).await;
    println!("{}", serde_json::to_string_pretty(&overview)?);
    Ok(())
}

pub(crate) async fn rate_limits(
    facade: &ApiFacade,
    scopes: Vec<String>,
    cancel: &CancellationToken,
) -> Result<()> {
    let request = scopes
        .into_iter()
        .fold(RateLimitRequest::all(), |request, scope| request.scope(scope));
    let limits = facade.rate_limits(&request, Some(cancel)).await;
    if limits.is_empty() {
        println!("No rate limit information available.");
        return Ok(());
    }
    println!("{:<20} {:>8} {:>10} {:>10}", "SCOPE", "LIMIT", "REMAINING", "RESET (s)");
    for limit in &limits.limits {
        let reset = limit
            .reset_in_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<20} {:>8} {:>10} {:>10}", limit.scope, limit.limit, limit.remaining, reset);
    }
    Ok(())
}

pub(crate) async fn models(facade: &ApiFacade, cancel: &CancellationToken) -> Result<()> {
    let models = facade
        .list_models(Some(cancel))
        .await
        .context("failed to list models")?;
    if models.is_empty() {
        println!("No models available.");
    }
    for model in models {
        match model.description {
            Some(description) => println!("{:<24} {:<24} {}", model.id, model.name, description),
            None => println!("{:<24} {}", model.id, model.name),
        }
    }
    Ok(())
}

pub(crate) async fn handle_assets_command(
    facade: &ApiFacade,
    action: AssetAction,
    cancel: &CancellationToken,
) -> Result<()> {
    match action {
        AssetAction::List { kind, search, format } => {
            let mut filters = AssetFilters::default();
            if let Some(kind) = kind {
                filters = filters.kind(kind);
            }
            if let Some(search) = search {
                filters = filters.search(search);
            }
            let drain = facade
                .drain_assets(&filters, Some(cancel))
                .await
                .context("failed to list assets")?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&drain)?),
                OutputFormat::Table => {
                    println!("{:<24} {:<12} {}", "ID", "KIND", "NAME");
                    println!("{}", "-".repeat(80));
                    for asset in &drain.assets {
                        println!("{:<24} {:<12} {}", asset.id, asset.kind, asset.name);
                    }
                    println!("{} assets from {} pages", drain.assets.len(), drain.pages);
                }
            }
            if drain.cancelled {
                bail!("listing cancelled after {} pages", drain.pages);
            }
            Ok(())
        }
        AssetAction::Delete { ids, batch_size } => {
            let report = facade
                .delete_assets(&ids, batch_size, Some(cancel))
                .await
                .context("failed to delete assets")?;

            info!(deleted = report.deleted.len(), failed = report.failed.len(), "Delete finished");
            println!("Deleted {} of {} assets", report.deleted.len(), ids.len());
            for failure in &report.failed {
                let hint = if failure.retryable { " (retryable)" } else { "" };
                println!("  failed {}: {}{}", failure.id, failure.error, hint);
            }
            if report.cancelled {
                println!("  skipped {} after cancellation", report.skipped.len());
            }
            if !report.is_complete() {
                bail!("{} assets were not deleted", ids.len() - report.deleted.len());
            }
            Ok(())
        }
    }
}
