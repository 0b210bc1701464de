//! Record types bound to a schema.
//!
//! A type implementing [`Model`] wraps a [`Record`] and knows its
//! `&'static` [`ModelSchema`]. The [`model!`](crate::model) macro declares
//! such a type and registers its schema the first time it is used.

use crate::models::{Record, Value};
use crate::schema::registrar::ModelSchema;
use tracing::debug;

pub trait Model: Sized {
    /// Schema shared by every instance of this type.
    fn schema() -> &'static ModelSchema;

    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn into_record(self) -> Record;

    /// Stored value for `key`, or `Null` when missing.
    fn get_value(&self, key: &str) -> Value {
        self.record().get(key).cloned().unwrap_or(Value::Null)
    }

    /// Stored value for `key`; when missing or `Null`, the field's default.
    ///
    /// Factory defaults are invoked on every call. Keys without a declared
    /// field or default resolve to `Null`.
    fn get_value_or_default(&self, key: &str) -> Value {
        match self.record().get(key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => match Self::schema()
                .field(key)
                .and_then(|field| field.default_value_now())
            {
                Some(value) => {
                    debug!(field = %key, value = %value, "using default value");
                    value
                }
                None => Value::Null,
            },
        }
    }

    /// Value of the primary-key column.
    fn primary_key_value(&self) -> Value {
        self.get_value(Self::schema().primary_key())
    }
}

/// Declare a record type and its fields.
///
/// The schema is registered on first access to `Model::schema()`. An invalid
/// declaration (no primary key, two primary keys, ...) panics there, since
/// the type cannot be used at all.
///
/// # Example
///
/// ```ignore
/// model! {
///     pub struct User in "users" {
///         Field::string("id").primary_key().default_with(next_id),
///         Field::string("name"),
///     }
/// }
/// ```
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(in $table:literal)? {
            $($field:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name($crate::models::Record);

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Builder-style setter for keyword-like construction.
            pub fn with(
                mut self,
                key: impl Into<String>,
                value: impl Into<$crate::models::Value>,
            ) -> Self {
                self.0.set(key, value);
                self
            }
        }

        impl $crate::schema::Model for $name {
            fn schema() -> &'static $crate::schema::ModelSchema {
                static SCHEMA: ::std::sync::LazyLock<$crate::schema::ModelSchema> =
                    ::std::sync::LazyLock::new(|| {
                        let declaration = $crate::schema::ModelDeclaration::new(stringify!($name))
                            $(.table($table))?
                            $(.field($field))+;
                        match $crate::schema::register_schema(declaration) {
                            Ok(schema) => schema,
                            Err(e) => panic!("{}", e),
                        }
                    });
                &SCHEMA
            }

            fn from_record(record: $crate::models::Record) -> Self {
                Self(record)
            }

            fn record(&self) -> &$crate::models::Record {
                &self.0
            }

            fn record_mut(&mut self) -> &mut $crate::models::Record {
                &mut self.0
            }

            fn into_record(self) -> $crate::models::Record {
                self.0
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::models::Record;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}
