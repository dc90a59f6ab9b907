//! Utility functions for formatting, matching and file replacement.

pub mod format;
pub mod fs;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, format_price, truncate_string};
pub use fs::{ensure_parent_dir, write_atomic};
