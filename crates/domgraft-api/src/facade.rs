//! Resilient composite operations over [`ServiceApi`].
//!
//! Every operation takes an optional [`CancellationToken`]. A cancelled
//! token stops work at the next request boundary; an in-flight request is
//! abandoned rather than awaited.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domgraft_config::ApiConfig;

use crate::error::ApiError;
use crate::service::ServiceApi;
use crate::types::*;

/// Shared entry point plugins use to talk to the service.
#[derive(Clone)]
pub struct ApiFacade {
    api: Arc<dyn ServiceApi>,
    page_size: u32,
    delete_batch_size: usize,
}

impl ApiFacade {
    pub fn new(api: Arc<dyn ServiceApi>) -> Self {
        let defaults = ApiConfig::default();
        Self {
            api,
            page_size: defaults.page_size,
            delete_batch_size: defaults.delete_batch_size,
        }
    }

    /// Facade using the page and batch sizes from `config`.
    pub fn with_config(api: Arc<dyn ServiceApi>, config: &ApiConfig) -> Self {
        Self {
            api,
            page_size: config.page_size,
            delete_batch_size: config.delete_batch_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn delete_batch_size(&self) -> usize {
        self.delete_batch_size
    }

    /// Rate limits from the primary endpoint, else the legacy one converted,
    /// else an empty response. Never fails.
    pub async fn rate_limits(
        &self,
        request: &RateLimitRequest,
        cancel: Option<&CancellationToken>,
    ) -> RateLimitResponse {
        match cancellable(cancel, self.api.rate_limits(request)).await {
            Ok(limits) => return limits,
            Err(ApiError::Cancelled) => return RateLimitResponse::default(),
            Err(e) => warn!("Primary rate limit endpoint failed, trying legacy: {}", e),
        }

        match cancellable(cancel, self.api.legacy_rate_limits()).await {
            Ok(legacy) => RateLimitResponse::from(legacy),
            Err(ApiError::Cancelled) => RateLimitResponse::default(),
            Err(e) => {
                warn!("Legacy rate limit endpoint failed, reporting none: {}", e);
                RateLimitResponse::default()
            }
        }
    }

    /// Follow `next_page_token` until the last page or cancellation.
    ///
    /// There is no page cap; the service decides when paging ends. A failed
    /// page request fails the whole drain.
    pub async fn drain_assets(
        &self,
        filters: &AssetFilters,
        cancel: Option<&CancellationToken>,
    ) -> Result<AssetDrain, ApiError> {
        let mut drain = AssetDrain::default();
        let mut token: Option<String> = None;

        loop {
            if is_cancelled(cancel) {
                info!(pages = drain.pages, assets = drain.assets.len(), "Asset drain cancelled");
                drain.cancelled = true;
                return Ok(drain);
            }

            let request = ListAssetsRequest {
                page_token: token.take(),
                page_size: Some(self.page_size),
                filters: filters.clone(),
            };
            let page = match cancellable(cancel, self.api.list_assets(&request)).await {
                Ok(page) => page,
                Err(ApiError::Cancelled) => {
                    drain.cancelled = true;
                    return Ok(drain);
                }
                Err(e) => return Err(e),
            };

            drain.pages += 1;
            token = page.next_token().map(str::to_string);
            debug!(page = drain.pages, items = page.items.len(), more = token.is_some(), "Asset page");
            drain.assets.extend(page.items);

            if token.is_none() {
                return Ok(drain);
            }
        }
    }

    /// Profile and subscriptions fetched concurrently; a failed half is
    /// replaced with its default. Never fails.
    pub async fn account_overview(&self, cancel: Option<&CancellationToken>) -> AccountOverview {
        let (profile, subscriptions) = futures::join!(
            cancellable(cancel, self.api.current_user()),
            cancellable(cancel, self.api.subscriptions()),
        );

        AccountOverview {
            profile: profile.unwrap_or_else(|e| {
                warn!("Failed to fetch profile: {}", e);
                UserProfile::default()
            }),
            subscriptions: subscriptions.unwrap_or_else(|e| {
                warn!("Failed to fetch subscriptions: {}", e);
                SubscriptionsResponse::default()
            }),
        }
    }

    /// Delete `ids` in batches of `batch_size` (the configured size when
    /// `None`). Each batch runs concurrently, batches run one after another,
    /// and cancellation is checked before every batch.
    pub async fn delete_assets(
        &self,
        ids: &[String],
        batch_size: Option<usize>,
        cancel: Option<&CancellationToken>,
    ) -> Result<DeleteReport, ApiError> {
        let batch_size = batch_size.unwrap_or(self.delete_batch_size);
        if batch_size == 0 {
            return Err(ApiError::InvalidRequest(
                "batch size must be greater than 0".to_string(),
            ));
        }

        let mut report = DeleteReport::default();
        for (index, batch) in ids.chunks(batch_size).enumerate() {
            if is_cancelled(cancel) {
                let done = index * batch_size;
                report.skipped = ids[done..].to_vec();
                report.cancelled = true;
                info!(deleted = report.deleted.len(), skipped = report.skipped.len(), "Delete cancelled");
                return Ok(report);
            }

            debug!(batch = index, size = batch.len(), "Deleting batch");
            let results = join_all(batch.iter().map(|id| self.api.delete_asset(id))).await;
            for (id, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => report.deleted.push(id.clone()),
                    Err(e) if e.is_not_found() => {
                        debug!(asset = %id, "Asset already deleted");
                        report.deleted.push(id.clone());
                    }
                    Err(e) => {
                        warn!(asset = %id, retryable = e.is_transient(), "Failed to delete asset: {}", e);
                        report.failed.push(DeleteFailure {
                            id: id.clone(),
                            error: e.to_string(),
                            retryable: e.is_transient(),
                        });
                    }
                }
            }
        }

        info!(deleted = report.deleted.len(), failed = report.failed.len(), "Delete finished");
        Ok(report)
    }

    pub async fn list_models(&self, cancel: Option<&CancellationToken>) -> Result<Vec<Model>, ApiError> {
        cancellable(cancel, self.api.list_models()).await
    }
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.is_some_and(CancellationToken::is_cancelled)
}

/// Run `request`, giving up with [`ApiError::Cancelled`] once `cancel` fires.
async fn cancellable<T, F>(cancel: Option<&CancellationToken>, request: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match cancel {
        None => request.await,
        Some(token) => {
            if token.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::Cancelled),
                result = request => result,
            }
        }
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
