//! JSON-file backed item store.
//!
//! The whole collection lives in memory behind one `RwLock`. Every mutation
//! holds the write lock across read-modify-persist, so two concurrent adds
//! can never hand out the same id, and readers only ever see the state
//! before or after a mutation. The file is rewritten in full (atomic
//! replace) before a mutation is acknowledged; if that write fails the
//! in-memory change is rolled back and the caller gets an error.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::{ItemRepository, StoreError};
use crate::models::{filter_by_name, Item};
use crate::utils::{ensure_parent_dir, write_atomic};

/// Items written to a fresh backing file.
pub fn seed_items() -> Vec<Item> {
    vec![
        Item::new("Laptop", "MacBook Pro 14\"", Decimal::new(249999, 2)).with_id(1),
        Item::new("Headphones", "Noise-cancelling Bluetooth", Decimal::new(29999, 2)).with_id(2),
        Item::new("Monitor", "27-inch 4K Display", Decimal::new(69900, 2)).with_id(3),
    ]
}

#[derive(Debug)]
struct StoreState {
    items: Vec<Item>,
    next_id: i64,
}

impl StoreState {
    fn new(items: Vec<Item>) -> Result<Self, StoreError> {
        let next_id = match items.iter().map(|i| i.id).max() {
            Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted)?,
            None => 1,
        };
        Ok(Self { items, next_id })
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open the store at `path`, seeding it when the file is missing,
    /// unreadable, empty, or not a non-empty item list.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        ensure_parent_dir(&path).map_err(|e| StoreError::persistence(&path, e))?;

        let items = match Self::load_file(&path) {
            Some(items) => {
                info!(path = %path.display(), count = items.len(), "Loaded items");
                items
            }
            None => {
                let seed = seed_items();
                Self::write_file(&path, &seed)?;
                info!(path = %path.display(), count = seed.len(), "Initialized store with sample items");
                seed
            }
        };

        Ok(Self {
            path,
            state: RwLock::new(StoreState::new(items)?),
        })
    }

    /// Open a store that starts with no items instead of the sample data.
    /// Nothing is written until the first mutation.
    pub fn open_empty(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        ensure_parent_dir(&path).map_err(|e| StoreError::persistence(&path, e))?;
        Ok(Self {
            path,
            state: RwLock::new(StoreState::new(Vec::new())?),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored items.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read_state()?.items.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Id the next `add` will assign.
    pub fn next_id(&self) -> Result<i64, StoreError> {
        Ok(self.read_state()?.next_id)
    }

    /// Returns `None` whenever the file cannot serve as the source of truth.
    fn load_file(path: &Path) -> Option<Vec<Item>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No store file yet");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read store file");
                return None;
            }
        };

        let trimmed = contents.trim();
        if trimmed.is_empty() || trimmed == "[]" || trimmed == "{}" {
            return None;
        }

        match serde_json::from_str::<Vec<Item>>(trimmed) {
            Ok(items) if items.is_empty() => None,
            Ok(items) => Some(items),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Store file is not a valid item list");
                None
            }
        }
    }

    fn write_file(path: &Path, items: &[Item]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(items)?;
        write_atomic(path, json.as_bytes()).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to persist items");
            StoreError::persistence(path, e)
        })
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))
    }
}

impl ItemRepository for JsonFileStore {
    fn get_all(&self, filter: Option<&str>) -> Result<Vec<Item>, StoreError> {
        let state = self.read_state()?;
        Ok(filter_by_name(state.items.clone(), filter))
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.len()
    }

    fn get_by_id(&self, id: i64) -> Result<Item, StoreError> {
        let state = self.read_state()?;
        state
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn add(&self, item: Item) -> Result<Item, StoreError> {
        let mut state = self.write_state()?;
        let following = state.next_id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        let stored = item.with_id(state.next_id);

        state.items.push(stored.clone());
        if let Err(e) = Self::write_file(&self.path, &state.items) {
            state.items.pop();
            return Err(e);
        }
        state.next_id = following;

        info!(id = stored.id, name = %stored.name, "Added item");
        Ok(stored)
    }

    fn update(&self, item: Item) -> Result<Item, StoreError> {
        let mut state = self.write_state()?;
        let index = state.position(item.id).ok_or(StoreError::NotFound(item.id))?;

        let previous = std::mem::replace(&mut state.items[index], item.clone());
        if let Err(e) = Self::write_file(&self.path, &state.items) {
            state.items[index] = previous;
            return Err(e);
        }

        info!(id = item.id, "Updated item");
        Ok(item)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.write_state()?;
        let Some(index) = state.position(id) else {
            debug!(id, "Delete of unknown item ignored");
            return Ok(false);
        };

        let removed = state.items.remove(index);
        if let Err(e) = Self::write_file(&self.path, &state.items) {
            state.items.insert(index, removed);
            return Err(e);
        }

        info!(id, "Deleted item");
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("data").join("items.json")
    }

    fn tablet() -> Item {
        Item::new("Tablet", "", Decimal::new(19900, 2))
    }

    #[test]
    fn test_open_missing_file_seeds_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        let store = JsonFileStore::open(&path).unwrap();

        assert_eq!(store.get_all(None).unwrap(), seed_items());
        assert_eq!(store.next_id().unwrap(), 4);
        let on_disk: Vec<Item> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, seed_items());
    }

    #[test]
    fn test_open_reseeds_empty_or_invalid_file() {
        for contents in ["", "   ", "[]", "{}", "not json", "{\"id\": 1}"] {
            let dir = tempfile::tempdir().unwrap();
            let path = store_path(&dir);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();

            let store = JsonFileStore::open(&path).unwrap();
            assert_eq!(store.len().unwrap(), 3, "contents {contents:?}");
        }
    }

    #[test]
    fn test_open_existing_file_derives_next_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let items = vec![
            Item::new("A", "", Decimal::ONE).with_id(7),
            Item::new("B", "", Decimal::ONE).with_id(3),
        ];
        fs::write(&path, serde_json::to_string(&items).unwrap()).unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get_all(None).unwrap(), items);
        assert_eq!(store.next_id().unwrap(), 8);
    }

    #[test]
    fn test_open_rejects_file_with_maximum_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let items = vec![Item::new("Last", "", Decimal::ONE).with_id(i64::MAX)];
        let contents = serde_json::to_string(&items).unwrap();
        fs::write(&path, &contents).unwrap();

        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::IdsExhausted)));
        // The file is left alone rather than reseeded.
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn test_add_fails_cleanly_when_ids_run_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let items = vec![Item::new("Nearly", "", Decimal::ONE).with_id(i64::MAX - 1)];
        fs::write(&path, serde_json::to_string(&items).unwrap()).unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(matches!(store.add(tablet()), Err(StoreError::IdsExhausted)));
        assert_eq!(store.get_all(None).unwrap(), items);
        assert_eq!(store.next_id().unwrap(), i64::MAX);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_count_tracks_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();
        let repo: &dyn ItemRepository = &store;

        assert_eq!(repo.count().unwrap(), 3);
        let created = repo.add(tablet()).unwrap();
        assert_eq!(repo.count().unwrap(), 4);
        repo.delete(created.id).unwrap();
        repo.delete(created.id).unwrap();
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_get_all_filters_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();

        let result = store.get_all(Some("head")).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Headphones");
        assert_eq!(store.get_all(Some("")).unwrap().len(), 3);
    }

    #[test]
    fn test_get_all_whitespace_search_is_not_blank() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();

        assert!(store.get_all(Some(" ")).unwrap().is_empty());

        store.add(Item::new("USB Hub", "", Decimal::ONE)).unwrap();
        let result = store.get_all(Some(" ")).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "USB Hub");
    }

    #[test]
    fn test_get_by_id_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();

        assert_eq!(store.get_by_id(2).unwrap().name, "Headphones");
        assert!(matches!(store.get_by_id(99), Err(StoreError::NotFound(99))));
    }

    #[test]
    fn test_add_ignores_client_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();

        let created = store.add(tablet().with_id(1)).unwrap();
        assert_eq!(created.id, 4);
        assert_eq!(store.get_by_id(1).unwrap().name, "Laptop");
        assert_eq!(store.get_by_id(4).unwrap(), created);
    }

    #[test]
    fn test_ids_strictly_increase_across_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open_empty(store_path(&dir)).unwrap();

        let mut seen = Vec::new();
        for round in 0..5 {
            let a = store.add(tablet()).unwrap();
            let b = store.add(tablet()).unwrap();
            seen.push(a.id);
            seen.push(b.id);
            // Deleting the newest item must not free its id.
            assert!(store.delete(b.id).unwrap(), "round {round}");
        }

        assert!(seen.windows(2).all(|w| w[0] < w[1]), "ids {seen:?}");
        assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_adds_get_unique_contiguous_ids() {
        const N: i64 = 32;
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let store = JsonFileStore::open_empty(&path).unwrap();

        std::thread::scope(|scope| {
            for n in 0..N {
                let store = &store;
                scope.spawn(move || {
                    store
                        .add(Item::new(format!("item-{n}"), "", Decimal::new(n, 0)))
                        .unwrap();
                });
            }
        });

        let items = store.get_all(None).unwrap();
        let ids: BTreeSet<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(items.len(), N as usize);
        assert_eq!(ids, (1..=N).collect::<BTreeSet<_>>());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_all(None).unwrap(), items);
    }

    #[test]
    fn test_every_mutation_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let store = JsonFileStore::open(&path).unwrap();

        let created = store.add(tablet()).unwrap();
        assert_eq!(JsonFileStore::open(&path).unwrap().get_all(None).unwrap(), store.get_all(None).unwrap());

        let mut renamed = created.clone();
        renamed.name = "Tablet Pro".to_string();
        store.update(renamed).unwrap();
        assert_eq!(JsonFileStore::open(&path).unwrap().get_all(None).unwrap(), store.get_all(None).unwrap());

        store.delete(1).unwrap();
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_all(None).unwrap(), store.get_all(None).unwrap());
        assert_eq!(reopened.get_by_id(4).unwrap().name, "Tablet Pro");
    }

    #[test]
    fn test_update_replaces_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(store_path(&dir)).unwrap();

        let mut monitor = store.get_by_id(3).unwrap();
        monitor.price = Decimal::new(64900, 2);
        store.update(monitor.clone()).unwrap();

        let all = store.get_all(None).unwrap();
        assert_eq!(all[2], monitor);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_update_missing_id_is_not_found_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let store = JsonFileStore::open(&path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result = store.update(tablet().with_id(42));

        assert!(matches!(result, Err(StoreError::NotFound(42))));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let store = JsonFileStore::open(&path).unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        assert!(!store.delete(99).unwrap());
        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_failed_persist_rolls_back_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        let store = JsonFileStore::open(&path).unwrap();

        // Replace the backing file with a directory so the next rename fails.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(store.add(tablet()), Err(StoreError::Persistence { .. })));
        assert!(matches!(store.delete(1), Err(StoreError::Persistence { .. })));
        let mut laptop = store.get_by_id(1).unwrap();
        laptop.name = "Changed".to_string();
        assert!(matches!(store.update(laptop), Err(StoreError::Persistence { .. })));

        assert_eq!(store.get_all(None).unwrap(), seed_items());
        assert_eq!(store.next_id().unwrap(), 4);

        // Once the file is writable again the id that failed is handed out.
        fs::remove_dir(&path).unwrap();
        assert_eq!(store.add(tablet()).unwrap().id, 4);
    }
}
