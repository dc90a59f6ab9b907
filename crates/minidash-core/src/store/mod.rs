//! Authoritative item store.
//!
//! [`ItemRepository`] is the CRUD seam the HTTP layer is written against.
//! [`JsonFileStore`] is the only implementation: an in-memory list guarded
//! by a single read/write lock and rewritten wholesale to a JSON file on
//! every mutation.

pub mod error;
pub mod file_store;

pub use error::StoreError;
pub use file_store::{seed_items, JsonFileStore};

use crate::models::Item;

/// CRUD operations over the item collection.
pub trait ItemRepository: Send + Sync {
    /// All items in insertion order, optionally narrowed by a case-insensitive
    /// name filter. Never touches the backing file.
    fn get_all(&self, filter: Option<&str>) -> Result<Vec<Item>, StoreError>;

    /// Number of stored items, without copying them.
    fn count(&self) -> Result<usize, StoreError>;

    /// The item with `id`, or [`StoreError::NotFound`].
    fn get_by_id(&self, id: i64) -> Result<Item, StoreError>;

    /// Store a new item under a freshly assigned id and return it.
    /// Any id on the incoming item is ignored.
    fn add(&self, item: Item) -> Result<Item, StoreError>;

    /// Replace the item with the same id. Missing ids are
    /// [`StoreError::NotFound`].
    fn update(&self, item: Item) -> Result<Item, StoreError>;

    /// Remove the item with `id`. Returns `false` when nothing was removed.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
