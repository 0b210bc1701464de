//! Record persistence operations.
//!
//! Per-type lookups ([`find`], [`find_all`], [`find_number`]) and per-record
//! writes ([`save`], [`update`], [`remove`]) built from the precomputed
//! [`ModelSchema`](crate::schema::ModelSchema) statements. Each call issues
//! exactly one statement on one pooled connection.
//!
//! Writes that affect a row count other than 1 are logged as warnings and
//! still return `Ok` with the count; callers that care must check it.

use crate::db::DbPool;
use crate::error::{OrmError, OrmResult};
use crate::models::Value;
use crate::schema::Model;
use crate::schema::registrar::quote_ident;
use std::str::FromStr;
use tracing::warn;

/// Row window for [`find_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most this many rows
    Rows(u64),
    /// Skip `offset` rows, then at most `count`
    Page { offset: u64, count: u64 },
}

impl Limit {
    fn sql(&self) -> &'static str {
        match self {
            Limit::Rows(_) => "limit ?",
            Limit::Page { .. } => "limit ?, ?",
        }
    }

    fn args(&self) -> Vec<Value> {
        match *self {
            Limit::Rows(n) => vec![to_value(n)],
            Limit::Page { offset, count } => vec![to_value(offset), to_value(count)],
        }
    }
}

fn to_value(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Limit::Rows(n)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Page { offset, count }
    }
}

/// Accepts one element (row cap) or two (offset, count).
impl TryFrom<&[u64]> for Limit {
    type Error = OrmError;

    fn try_from(values: &[u64]) -> Result<Self, Self::Error> {
        match *values {
            [n] => Ok(Limit::Rows(n)),
            [offset, count] => Ok(Limit::Page { offset, count }),
            _ => Err(OrmError::invalid_limit(format!(
                "expected 1 or 2 values, got {}",
                values.len()
            ))),
        }
    }
}

/// Parses `"5"` or `"10,5"`.
impl FromStr for Limit {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u64>()
                    .map_err(|_| OrmError::invalid_limit(format!("'{}' is not a row count", s)))
            })
            .collect::<OrmResult<Vec<u64>>>()?;
        Limit::try_from(values.as_slice())
    }
}

/// Optional clauses for [`find_all`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// WHERE fragment with `?` placeholders
    pub filter: Option<String>,
    pub args: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<Limit>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<String>, args: Vec<Value>) -> Self {
        self.filter = Some(filter.into());
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Build the statement text and its arguments on top of `select_sql`.
    pub fn to_sql(&self, select_sql: &str) -> (String, Vec<Value>) {
        let mut sql = vec![select_sql.to_string()];
        let mut args = self.args.clone();
        if let Some(filter) = &self.filter {
            sql.push("where".to_string());
            sql.push(filter.clone());
        }
        if let Some(order_by) = &self.order_by {
            sql.push("order by".to_string());
            sql.push(order_by.clone());
        }
        if let Some(limit) = &self.limit {
            sql.push(limit.sql().to_string());
            args.extend(limit.args());
        }
        (sql.join(" "), args)
    }
}

/// Find a record by primary key. A missing row is `Ok(None)`.
pub async fn find<M: Model>(pool: &DbPool, pk: impl Into<Value>) -> OrmResult<Option<M>> {
    let schema = M::schema();
    let sql = format!(
        "{} where {}=?",
        schema.select_sql(),
        quote_ident(schema.primary_key())
    );
    let rows = pool.select(&sql, &[pk.into()], Some(1)).await?;
    Ok(rows.into_iter().next().map(|row| M::from_record(row.into())))
}

/// Find every record matching `options`, in backend order.
pub async fn find_all<M: Model>(pool: &DbPool, options: &QueryOptions) -> OrmResult<Vec<M>> {
    let (sql, args) = options.to_sql(M::schema().select_sql());
    let rows = pool.select(&sql, &args, None).await?;
    Ok(rows
        .into_iter()
        .map(|row| M::from_record(row.into()))
        .collect())
}

/// Evaluate an aggregate such as `count(id)` over the model's table.
///
/// The expression is aliased `_num_`. Returns `None` when no row comes back.
pub async fn find_number<M: Model>(
    pool: &DbPool,
    select_expr: &str,
    filter: Option<&str>,
    args: &[Value],
) -> OrmResult<Option<Value>> {
    let mut sql = format!(
        "select {} _num_ from {}",
        select_expr,
        quote_ident(M::schema().table_name())
    );
    if let Some(filter) = filter {
        sql.push_str(" where ");
        sql.push_str(filter);
    }
    let rows = pool.select(&sql, args, Some(1)).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|mut row| row.shift_remove("_num_")))
}

/// Insert the record.
///
/// Missing values are filled from field defaults and written back into the
/// record, so a generated key can be used for later lookups.
pub async fn save<M: Model>(pool: &DbPool, model: &mut M) -> OrmResult<u64> {
    let schema = M::schema();
    let mut args = Vec::with_capacity(schema.fields().len() + 1);
    for key in schema.fields().iter().map(String::as_str).chain([schema.primary_key()]) {
        let value = model.get_value_or_default(key);
        if model.record().get(key) != Some(&value) {
            model.record_mut().set(key, value.clone());
        }
        args.push(value);
    }

    let rows = pool.execute(schema.insert_sql(), &args).await?;
    if rows != 1 {
        warn!(table = %schema.table_name(), affected = rows, "failed to insert record");
    }
    Ok(rows)
}

/// Update every non-key column by primary key. Missing values are written as NULL.
pub async fn update<M: Model>(pool: &DbPool, model: &M) -> OrmResult<u64> {
    let schema = M::schema();
    let mut args: Vec<Value> = schema
        .fields()
        .iter()
        .map(|key| model.get_value(key))
        .collect();
    args.push(model.primary_key_value());

    let rows = pool.execute(schema.update_sql(), &args).await?;
    if rows != 1 {
        warn!(table = %schema.table_name(), affected = rows, "failed to update by primary key");
    }
    Ok(rows)
}

/// Delete by primary key.
pub async fn remove<M: Model>(pool: &DbPool, model: &M) -> OrmResult<u64> {
    let schema = M::schema();
    let rows = pool
        .execute(schema.delete_sql(), &[model.primary_key_value()])
        .await?;
    if rows != 1 {
        warn!(table = %schema.table_name(), affected = rows, "failed to remove by primary key");
    }
    Ok(rows)
}
