//! Database access layer.
//!
//! This module provides:
//! - Connection pool creation and lifecycle
//! - Statement execution with placeholder rewriting
//! - Row decoding into ordered value maps
//! - Backend dispatch macros

#[macro_use]
pub mod macros;
pub mod executor;
pub mod pool;
pub mod types;

pub use executor::{PlaceholderStyle, rewrite_placeholders};
pub use macros::DatabaseType;
pub use pool::DbPool;
