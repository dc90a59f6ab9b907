//! Local caching module for offline data access.
//!
//! `CacheManager` keeps the last successfully fetched item list on disk.
//! `ResilientClient` wraps the API: reads refresh that snapshot and fall
//! back to it when the backend is unreachable, writes always go live.

pub mod manager;
pub mod resilient;

pub use manager::{CacheManager, CachedData};
pub use resilient::{ClientError, Fetched, ResilientClient};
