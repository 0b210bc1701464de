//! Data models shared across the ORM.
//!
//! This module re-exports the value and record types used by the executor
//! and the CRUD layer.

pub mod record;
pub mod value;

pub use record::Record;
pub use value::{Row, Value};
