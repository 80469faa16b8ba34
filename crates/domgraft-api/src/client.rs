//! HTTP client for the service API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use domgraft_config::ApiConfig;

use crate::error::ApiError;
use crate::service::ServiceApi;
use crate::types::*;

/// Per-call options layered over the client defaults.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    headers: Vec<(String, String)>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; it replaces a default header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Typed client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    headers: HeaderMap,
}

impl ApiClient {
    /// Client with default timeouts and no default headers.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::from_config(&ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "base URL cannot have paths appended: {}",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            headers,
        })
    }

    /// Same client with an extra default header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded as a single
    /// path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        options: &CallOptions,
    ) -> Result<T, ApiError> {
        let body = self
            .send(Method::GET, segments, query, None::<&()>, options)
            .await?;
        decode(&body)
    }

    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
        options: &CallOptions,
    ) -> Result<T, ApiError> {
        let body = self
            .send(Method::POST, segments, &[], Some(body), options)
            .await?;
        decode(&body)
    }

    pub async fn delete(&self, segments: &[&str], options: &CallOptions) -> Result<(), ApiError> {
        self.send(Method::DELETE, segments, &[], None::<&()>, options)
            .await
            .map(|_| ())
    }

    /// Send a request and return the body of a 2xx response.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
        options: &CallOptions,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(segments)?;
        let mut headers = self.headers.clone();
        for (name, value) in &options.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        debug!(method = %method, url = %url, "API request");

        let mut request = self.client.request(method.clone(), url.clone()).headers(headers);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(method = %method, url = %url, status = status.as_u16(), "API request failed");
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ApiError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid header name '{}': {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid value for header '{}': {}", name, e)))?;
    Ok((header_name, header_value))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    // An empty body (204) decodes as JSON `null`.
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl ServiceApi for ApiClient {
    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get(&["users", "me"], &[], &CallOptions::default()).await
    }

    async fn subscriptions(&self) -> Result<SubscriptionsResponse, ApiError> {
        self.get(&["users", "me", "subscriptions"], &[], &CallOptions::default())
            .await
    }

    async fn rate_limits(&self, request: &RateLimitRequest) -> Result<RateLimitResponse, ApiError> {
        self.post(&["rate-limits"], request, &CallOptions::default())
            .await
    }

    async fn legacy_rate_limits(&self) -> Result<LegacyRateLimitResponse, ApiError> {
        self.get(&["rate-limits", "legacy"], &[], &CallOptions::default())
            .await
    }

    async fn list_models(&self) -> Result<Vec<Model>, ApiError> {
        let response: ModelsResponse = self.get(&["models"], &[], &CallOptions::default()).await?;
        Ok(response.models)
    }

    async fn list_assets(&self, request: &ListAssetsRequest) -> Result<AssetPage, ApiError> {
        self.get(&["assets"], &request.query_pairs(), &CallOptions::default())
            .await
    }

    async fn delete_asset(&self, id: &str) -> Result<(), ApiError> {
        if id.is_empty() {
            return Err(ApiError::InvalidRequest("asset id must not be empty".to_string()));
        }
        self.delete(&["assets", id], &CallOptions::default()).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
