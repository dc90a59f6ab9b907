//! Read-through client with offline fallback.
//!
//! Reads degrade, writes do not: a failed list read is answered from the
//! last snapshot when one exists, while add/update/delete always need a
//! successful round trip and surface their failure untouched.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CacheManager, CachedData};
use crate::api::{ApiError, CatalogApi};
use crate::models::{filter_by_name, Item};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Backend unreachable or answered with a failure, and no usable
    /// snapshot could stand in for it.
    #[error(transparent)]
    Transport(#[from] ApiError),
}

impl ClientError {
    pub fn api(&self) -> &ApiError {
        match self {
            ClientError::Transport(e) => e,
        }
    }
}

/// Result of a read that may have been served from the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// Fresh data from the backend.
    Live(T),
    /// Backend unreachable; last known-good data, written at `cached_at`.
    Stale { data: T, cached_at: DateTime<Utc> },
}

impl<T> Fetched<T> {
    pub fn data(&self) -> &T {
        match self {
            Fetched::Live(data) | Fetched::Stale { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            Fetched::Live(data) | Fetched::Stale { data, .. } => data,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Fetched::Stale { .. })
    }

    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Fetched::Live(_) => None,
            Fetched::Stale { cached_at, .. } => Some(*cached_at),
        }
    }
}

pub struct ResilientClient<A> {
    api: A,
    cache: CacheManager,
}

impl<A: CatalogApi> ResilientClient<A> {
    pub fn new(api: A, cache: CacheManager) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Last-updated marker of the snapshot, if there is a readable one.
    pub fn snapshot_age(&self) -> Option<CachedData<()>> {
        match self.cache.load_items() {
            Ok(Some(cached)) => Some(CachedData {
                data: (),
                cached_at: cached.cached_at,
            }),
            _ => None,
        }
    }

    /// List items, optionally filtered by name.
    ///
    /// On success the snapshot is replaced with whatever the backend
    /// returned; on failure the snapshot is served instead, or the original
    /// error is returned when there is none. Blank search text means no
    /// filter on this side.
    pub async fn get_items(&self, search: Option<&str>) -> Result<Fetched<Vec<Item>>, ClientError> {
        let search = search.filter(|s| !s.trim().is_empty());
        match self.api.fetch_items(search).await {
            Ok(items) => {
                if let Err(e) = self.cache.save_items(&items) {
                    warn!(error = %e, "Failed to cache items snapshot");
                }
                Ok(Fetched::Live(filter_by_name(items, search)))
            }
            Err(fetch_error) => match self.cache.load_items() {
                Ok(Some(cached)) => {
                    warn!(
                        error = %fetch_error,
                        age = %cached.age_display(),
                        "Backend unavailable, serving cached items"
                    );
                    Ok(Fetched::Stale {
                        data: filter_by_name(cached.data, search),
                        cached_at: cached.cached_at,
                    })
                }
                Ok(None) => {
                    debug!("No items snapshot to fall back on");
                    Err(fetch_error.into())
                }
                Err(e) => {
                    debug!(error = %e, "Items snapshot unusable");
                    Err(fetch_error.into())
                }
            },
        }
    }

    /// Single item, live only.
    pub async fn get_item(&self, id: i64) -> Result<Item, ClientError> {
        Ok(self.api.fetch_item(id).await?)
    }

    pub async fn add_item(&self, item: &Item) -> Result<Item, ClientError> {
        let created = self.api.add_item(item).await?;
        info!(id = created.id, "Item created");
        Ok(created)
    }

    pub async fn update_item(&self, item: &Item) -> Result<(), ClientError> {
        self.api.update_item(item).await?;
        info!(id = item.id, "Item updated");
        Ok(())
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), ClientError> {
        self.api.delete_item(id).await?;
        info!(id, "Item deleted");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
