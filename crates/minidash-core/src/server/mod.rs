//! HTTP transport for the item store.
//!
//! Requires the `server` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /items?search=` - list items, optionally filtered by name.
//! - `GET /items/:id` - one item, 404 if absent.
//! - `POST /items` - create; 201 with the stored item and a `Location` header.
//! - `PUT /items/:id` - replace; 204, 400 on path/body id mismatch, 404 if absent.
//! - `DELETE /items/:id` - 204 whether or not the item existed.
//! - `GET /health` - `{ "ok": true, "items": <count> }`.

pub mod routes;

pub use routes::{router, serve, serve_with_shutdown, SharedStore};
