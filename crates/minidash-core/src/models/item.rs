use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::contains_ignore_case;

/// A priced catalog record.
///
/// `id` is assigned by the store; whatever a client sends on create is
/// overwritten. `price` travels as an exact JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
}

impl Item {
    /// Build an item that has not been stored yet (`id` is 0).
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            price,
        }
    }

    /// Same item with a different id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Whether the name contains `filter`, ignoring case.
    /// A missing or empty filter matches every item. Whitespace is a
    /// real needle here; only the client treats blank text as "no filter".
    pub fn matches_name(&self, filter: Option<&str>) -> bool {
        match normalize_filter(filter) {
            Some(needle) => contains_ignore_case(&self.name, needle),
            None => true,
        }
    }
}

fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    filter.filter(|s| !s.is_empty())
}

/// Keep only the items whose name contains `filter`.
///
/// Applied both by the store and again by the client cache, so it must be
/// idempotent: filtering an already-filtered list by the same text is a no-op.
pub fn filter_by_name(items: Vec<Item>, filter: Option<&str>) -> Vec<Item> {
    if normalize_filter(filter).is_none() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.matches_name(filter))
        .collect()
}
