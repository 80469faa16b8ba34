//! The service endpoints the facade composes.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::*;

/// One method per remote endpoint.
///
/// [`ApiClient`](crate::ApiClient) is the HTTP implementation; tests plug in
/// fakes to drive the facade.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// `GET /users/me`
    async fn current_user(&self) -> Result<UserProfile, ApiError>;

    /// `GET /users/me/subscriptions`
    async fn subscriptions(&self) -> Result<SubscriptionsResponse, ApiError>;

    /// `POST /rate-limits`
    async fn rate_limits(&self, request: &RateLimitRequest) -> Result<RateLimitResponse, ApiError>;

    /// `GET /rate-limits/legacy`
    async fn legacy_rate_limits(&self) -> Result<LegacyRateLimitResponse, ApiError>;

    /// `GET /models`
    async fn list_models(&self) -> Result<Vec<Model>, ApiError>;

    /// `GET /assets`
    async fn list_assets(&self, request: &ListAssetsRequest) -> Result<AssetPage, ApiError>;

    /// `DELETE /assets/{id}`
    async fn delete_asset(&self, id: &str) -> Result<(), ApiError>;
}
