//! Data models for the catalog.
//!
//! The catalog has a single entity, [`Item`]. The same JSON shape is used
//! on the wire, in the store's backing file and in the client snapshot.

pub mod item;

pub use item::{filter_by_name, Item};
