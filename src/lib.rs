//! Awesome ORM Library
//!
//! A minimal asynchronous object-relational mapping layer: declare record
//! types with [`model!`], create a [`DbPool`] once, then persist and look up
//! records with the functions in [`crud`].

pub mod config;
pub mod crud;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod schema;

pub use config::{Config, PoolConfig, SqliteConfig};
pub use crud::{Limit, QueryOptions, find, find_all, find_number, remove, save, update};
pub use db::DbPool;
pub use error::{OrmError, OrmResult};
pub use models::{Record, Row, Value};
pub use schema::{Field, Model, ModelSchema};
