use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::models::Item;
use crate::utils::write_atomic;

/// A snapshot older than this is flagged as stale in the UI.
const STALE_AFTER_MINUTES: i64 = 60;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Snapshot of the item list.
const ITEMS_SNAPSHOT: &str = "items";

/// Cached payload plus the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.cached_at)
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    /// Short relative age such as `"5m ago"` or `"3h ago"`, rounded to the
    /// nearest unit. Future timestamps (clock skew) read as `"just now"`.
    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            m if m < 1 => "just now".to_string(),
            m if m < MINUTES_PER_HOUR => format!("{}m ago", m),
            m if m < MINUTES_PER_DAY => {
                format!("{}h ago", (m + MINUTES_PER_HOUR / 2) / MINUTES_PER_HOUR)
            }
            m => format!("{}d ago", (m + MINUTES_PER_DAY / 2) / MINUTES_PER_DAY),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age() > Duration::minutes(STALE_AFTER_MINUTES)
    }
}

/// Owns the client's snapshot directory.
///
/// Snapshots are stored as the bare JSON payload (for items: the same list
/// shape as the backend's file). The file's modification time is the
/// last-updated marker.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name).with_extension("json")
    }

    fn read_snapshot<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.snapshot_path(name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read snapshot {}", path.display()))
            }
        };

        let data = serde_json::from_str(&contents)
            .with_context(|| format!("Snapshot {} is not valid JSON", path.display()))?;
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to stat snapshot {}", path.display()))?;

        Ok(Some(CachedData {
            data,
            cached_at: modified.into(),
        }))
    }

    fn write_snapshot<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.snapshot_path(name);
        let json = serde_json::to_vec_pretty(data)?;
        write_atomic(&path, &json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))
    }

    pub fn load_items(&self) -> Result<Option<CachedData<Vec<Item>>>> {
        self.read_snapshot(ITEMS_SNAPSHOT)
    }

    /// Replace the snapshot wholesale.
    pub fn save_items(&self, items: &[Item]) -> Result<()> {
        self.write_snapshot(ITEMS_SNAPSHOT, items)
    }

    /// Age of the items snapshot for display, or `"never"`.
    pub fn items_age(&self) -> String {
        match self.load_items() {
            Ok(Some(snapshot)) => snapshot.age_display(),
            Ok(None) => "never".to_string(),
            Err(e) => {
                tracing::debug!(error = %e, "Unreadable items snapshot");
                "never".to_string()
            }
        }
    }
}
