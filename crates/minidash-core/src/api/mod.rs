//! REST API client module for the catalog backend.
//!
//! This module provides the `CatalogApi` trait (the client side of the CRUD
//! contract) and `ApiClient`, its reqwest implementation.

pub mod client;
pub mod error;

use std::future::Future;

pub use client::ApiClient;
pub use error::ApiError;

use crate::models::Item;

/// Client side of the CRUD contract exposed by the backend.
pub trait CatalogApi: Send + Sync {
    /// `GET /items?search=...`
    fn fetch_items(
        &self,
        search: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Item>, ApiError>> + Send;

    /// `GET /items/{id}`
    fn fetch_item(&self, id: i64) -> impl Future<Output = Result<Item, ApiError>> + Send;

    /// `POST /items`, returning the stored item with its assigned id.
    fn add_item(&self, item: &Item) -> impl Future<Output = Result<Item, ApiError>> + Send;

    /// `PUT /items/{id}`
    fn update_item(&self, item: &Item) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /items/{id}`
    fn delete_item(&self, id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
}
