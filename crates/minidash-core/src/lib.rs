//! MiniDashboard core - a small priced-item catalog.
//!
//! The backend side is the file-persisted [`store::JsonFileStore`], served
//! over HTTP by the [`server`] module. The client side talks to it through
//! [`api::ApiClient`] and degrades to the last good snapshot through
//! [`cache::ResilientClient`] when the backend cannot be reached.

pub mod api;
pub mod cache;
pub mod command;
pub mod config;
pub mod dashboard;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod utils;

pub use api::{ApiClient, ApiError, CatalogApi};
pub use cache::{CacheManager, CachedData, ClientError, Fetched, ResilientClient};
pub use command::{CommandError, SingleFlight};
pub use dashboard::{Dashboard, DashboardError, DashboardState};
pub use models::Item;
pub use store::{ItemRepository, JsonFileStore, StoreError};
