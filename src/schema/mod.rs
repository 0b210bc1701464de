//! Schema declaration and registration.
//!
//! - Field descriptors
//! - One-time model registration and SQL template generation
//! - The `Model` trait and `model!` declaration macro

pub mod field;
pub mod model;
pub mod registrar;

pub use field::{Field, FieldDefault, FieldKind};
pub use model::Model;
pub use registrar::{ModelDeclaration, ModelSchema, register_schema};
