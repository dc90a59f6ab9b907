//! API client for communicating with the catalog backend.
//!
//! This module provides the `ApiClient` struct, a thin reqwest wrapper
//! over the five CRUD endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiError, CatalogApi};
use crate::models::Item;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Long enough for a slow disk on the backend, short enough that the
/// offline snapshot kicks in quickly.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// API client for the catalog backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn items_url(&self) -> String {
        format!("{}/items", self.base_url)
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/items/{}", self.base_url, id)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }
}

impl CatalogApi for ApiClient {
    async fn fetch_items(&self, search: Option<&str>) -> Result<Vec<Item>, ApiError> {
        let url = self.items_url();
        let mut request = self.client.get(&url);
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            request = request.query(&[("search", search)]);
        }

        let response = Self::check_response(request.send().await?).await?;
        let items: Vec<Item> = Self::parse_json(response, &url).await?;
        debug!(count = items.len(), ?search, "Fetched items");
        Ok(items)
    }

    async fn fetch_item(&self, id: i64) -> Result<Item, ApiError> {
        let url = self.item_url(id);
        let response = Self::check_response(self.client.get(&url).send().await?).await?;
        Self::parse_json(response, &url).await
    }

    async fn add_item(&self, item: &Item) -> Result<Item, ApiError> {
        let url = self.items_url();
        let response = self.client.post(&url).json(item).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, &url).await
    }

    async fn update_item(&self, item: &Item) -> Result<(), ApiError> {
        let url = self.item_url(item.id);
        let response = self.client.put(&url).json(item).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn delete_item(&self, id: i64) -> Result<(), ApiError> {
        let url = self.item_url(id);
        let response = self.client.delete(&url).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }
}
