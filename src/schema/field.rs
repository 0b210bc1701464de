//! Field descriptors.
//!
//! A [`Field`] is pure column metadata: name, SQL type, key flag and default.
//! It never holds a live value.

use crate::models::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Kind of column a field maps to, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Float,
    Text,
    Custom,
}

impl FieldKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::String => "StringField",
            Self::Integer => "IntegerField",
            Self::Boolean => "BooleanField",
            Self::Float => "FloatField",
            Self::Text => "TextField",
            Self::Custom => "Field",
        }
    }
}

/// Default used when a record has no value for a field.
#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    /// Zero-argument factory, invoked each time a default is needed.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    /// Produce the default value, invoking the factory if there is one.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    column_type: String,
    primary_key: bool,
    default: Option<FieldDefault>,
    kind: FieldKind,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        column_type: impl Into<String>,
        primary_key: bool,
        default: Option<FieldDefault>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            primary_key,
            default,
            kind: FieldKind::Custom,
        }
    }

    /// `varchar(100)` column with no default.
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::String,
            ..Self::new(name, "varchar(100)", false, None)
        }
    }

    /// `bigint` column defaulting to 0.
    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::new(name, "bigint", false, Some(FieldDefault::Value(Value::Int(0))))
        }
    }

    /// `boolean` column defaulting to false. Booleans are never keys.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Boolean,
            ..Self::new(
                name,
                "boolean",
                false,
                Some(FieldDefault::Value(Value::Bool(false))),
            )
        }
    }

    /// `real` column defaulting to 0.0.
    pub fn float(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Float,
            ..Self::new(name, "real", false, Some(FieldDefault::Value(Value::Float(0.0))))
        }
    }

    /// `text` column with no default. Text columns are never keys.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Text,
            ..Self::new(name, "text", false, None)
        }
    }

    /// Mark as primary key.
    ///
    /// Boolean and text fields cannot be keys: the call is ignored with a
    /// warning, and registration then reports the model as having no
    /// primary key unless another field is one.
    pub fn primary_key(mut self) -> Self {
        if matches!(self.kind, FieldKind::Boolean | FieldKind::Text) {
            warn!(
                field = %self.name,
                kind = self.kind.display_name(),
                "field kind cannot be a primary key, ignoring"
            );
        } else {
            self.primary_key = true;
        }
        self
    }

    /// Override the column DDL type, e.g. `varchar(50)`.
    pub fn ddl(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Factory(Arc::new(factory)));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Resolve the default, or `None` when the field has none.
    pub fn default_value_now(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::resolve)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}, {}:{}>",
            self.kind.display_name(),
            self.column_type,
            self.name
        )
    }
}
