//! Row decoding.
//!
//! Backend rows are turned into ordered [`Row`] maps of scalar [`Value`]s.
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! Decimals become strings (exact representation), binary columns become
//! UTF-8 text when valid and base64 otherwise, and temporal columns become
//! their textual form.

use crate::db::DatabaseType;
use crate::error::OrmResult;
use crate::models::{Row, Value};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row as _, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    UnsignedInteger,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Date,
    Time,
    DateTime,
    Timestamp,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::Sqlite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower == "year" {
        if lower.contains("unsigned") {
            return TypeCategory::UnsignedInteger;
        }
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower.contains("blob") || lower.contains("binary") {
        return TypeCategory::Binary;
    }

    match lower.as_str() {
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "datetime" => TypeCategory::DateTime,
        "timestamp" => TypeCategory::Timestamp,
        _ if lower.contains("char") || lower.contains("text") || lower == "json" => {
            TypeCategory::Text
        }
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Binary column contents as a string value: UTF-8 text when valid, base64 otherwise.
pub fn binary_to_value(bytes: &[u8]) -> Value {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => Value::String(s.to_string()),
        Err(_) => Value::String(STANDARD.encode(bytes)),
    }
}

fn float_value(v: f64) -> Value {
    Value::Float(v)
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Trait for converting backend rows into ordered value maps.
pub trait DecodeRow {
    fn decode_row(&self) -> OrmResult<Row>;
}

impl DecodeRow for MySqlRow {
    fn decode_row(&self) -> OrmResult<Row> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::MySql);
                let value = mysql::decode_column(self, idx, category)?;
                Ok((col.name().to_string(), value))
            })
            .collect()
    }
}

impl DecodeRow for SqliteRow {
    fn decode_row(&self) -> OrmResult<Row> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::Sqlite);
                let value = sqlite::decode_column(self, idx, category)?;
                Ok((col.name().to_string(), value))
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> OrmResult<Value> {
        let value = match category {
            TypeCategory::Decimal => row
                .try_get::<Option<RawDecimal>, _>(idx)?
                .map(|v| Value::String(v.0)),
            TypeCategory::Integer => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
            TypeCategory::UnsignedInteger => row
                .try_get::<Option<u64>, _>(idx)?
                .map(|v| match i64::try_from(v) {
                    Ok(v) => Value::Int(v),
                    Err(_) => Value::String(v.to_string()),
                }),
            TypeCategory::Boolean => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
            TypeCategory::Float => match row.try_get::<Option<f64>, _>(idx) {
                Ok(v) => v.map(float_value),
                Err(_) => row
                    .try_get::<Option<f32>, _>(idx)?
                    .map(|v| float_value(f64::from(v))),
            },
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)?
                .map(|v| binary_to_value(&v)),
            TypeCategory::Date => row
                .try_get::<Option<NaiveDate>, _>(idx)?
                .map(|v| Value::String(v.to_string())),
            TypeCategory::Time => row
                .try_get::<Option<NaiveTime>, _>(idx)?
                .map(|v| Value::String(v.to_string())),
            TypeCategory::DateTime => row
                .try_get::<Option<NaiveDateTime>, _>(idx)?
                .map(|v| Value::String(v.to_string())),
            TypeCategory::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)?
                .map(|v| Value::String(v.naive_utc().to_string())),
            TypeCategory::Text => row.try_get::<Option<String>, _>(idx)?.map(Value::String),
            TypeCategory::Unknown => match row.try_get::<Option<String>, _>(idx) {
                Ok(v) => v.map(Value::String),
                Err(_) => row
                    .try_get::<Option<Vec<u8>>, _>(idx)?
                    .map(|v| binary_to_value(&v)),
            },
        };
        Ok(value.unwrap_or(Value::Null))
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        category: TypeCategory,
    ) -> OrmResult<Value> {
        let value = match category {
            TypeCategory::Integer | TypeCategory::UnsignedInteger => {
                row.try_get::<Option<i64>, _>(idx)?.map(Value::Int)
            }
            TypeCategory::Boolean => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
            TypeCategory::Float | TypeCategory::Decimal => {
                row.try_get::<Option<f64>, _>(idx)?.map(float_value)
            }
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)?
                .map(|v| binary_to_value(&v)),
            _ => decode_dynamic(row, idx)?,
        };
        Ok(value.unwrap_or(Value::Null))
    }

    /// SQLite values carry their own storage class; try them in turn.
    fn decode_dynamic(row: &SqliteRow, idx: usize) -> OrmResult<Option<Value>> {
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return Ok(v.map(Value::String));
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return Ok(v.map(Value::Int));
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return Ok(v.map(float_value));
        }
        Ok(row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(|v| binary_to_value(&v)))
    }
}
