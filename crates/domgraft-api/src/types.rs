//! Request and response types for the service API.
//!
//! Wire names are camelCase. Everything received is read-only once decoded.

use serde::{Deserialize, Serialize};

/// Body of `POST /rate-limits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRequest {
    /// Scopes to report; empty asks for every scope.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl RateLimitRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub scope: String,
    pub limit: u32,
    pub remaining: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_in_secs: Option<u64>,
}

/// Rate limits per scope. The default (no scopes) is the neutral answer used
/// when nothing could be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResponse {
    #[serde(default)]
    pub limits: Vec<RateLimit>,
}

impl RateLimitResponse {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn get(&self, scope: &str) -> Option<&RateLimit> {
        self.limits.iter().find(|limit| limit.scope == scope)
    }
}

/// Shape returned by `GET /rate-limits/legacy`: a single global bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRateLimitResponse {
    pub max_requests: u32,
    pub remaining_requests: u32,
    #[serde(default)]
    pub reset_seconds: Option<u64>,
}

/// Scope name the legacy bucket is reported under.
pub const LEGACY_SCOPE: &str = "global";

impl From<LegacyRateLimitResponse> for RateLimitResponse {
    fn from(legacy: LegacyRateLimitResponse) -> Self {
        Self {
            limits: vec![RateLimit {
                scope: LEGACY_SCOPE.to_string(),
                limit: legacy.max_requests,
                // Some deployments report more remaining than the limit.
                remaining: legacy.remaining_requests.min(legacy.max_requests),
                reset_in_secs: legacy.reset_seconds,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// One page of `GET /assets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPage {
    #[serde(default)]
    pub items: Vec<Asset>,
    /// Absent or empty on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl AssetPage {
    /// The token for the next page, treating an empty string as "no more".
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl AssetFilters {
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAssetsRequest {
    pub page_token: Option<String>,
    pub page_size: Option<u32>,
    pub filters: AssetFilters,
}

impl ListAssetsRequest {
    /// Query string pairs, omitting unset values.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(token) = &self.page_token {
            pairs.push(("pageToken", token.clone()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("pageSize", size.to_string()));
        }
        if let Some(kind) = &self.filters.kind {
            pairs.push(("kind", kind.clone()));
        }
        if let Some(search) = &self.filters.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub plan: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionsResponse {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl SubscriptionsResponse {
    pub fn active(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter().filter(|s| s.active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `GET /models`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<Model>,
}

/// Profile and subscriptions fetched together. Either half may be the
/// default if its request failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverview {
    pub profile: UserProfile,
    pub subscriptions: SubscriptionsResponse,
}

/// Result of draining every asset page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDrain {
    pub assets: Vec<Asset>,
    pub pages: usize,
    /// Stopped early because the operation was cancelled.
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub id: String,
    pub error: String,
    /// The failure was transient; deleting again may succeed.
    pub retryable: bool,
}

/// Outcome of a batched delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
    /// Ids never attempted because the operation was cancelled.
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
