//! Query execution.
//!
//! Statements are written with portable `?` placeholders. Before execution
//! every placeholder is rewritten to the backend's native positional form,
//! arguments are bound in order, and the statement runs on exactly one
//! connection acquired from the pool. The connection is a scoped guard: it
//! returns to the pool on every exit path, including errors.
//!
//! # Architecture
//!
//! The per-backend code lives in the `mysql` and `sqlite` submodules below.
//! Both have the same shape; the SQL text they receive is identical.

use crate::db::DatabaseType;
use crate::db::pool::DbPool;
use crate::db::types::DecodeRow;
use crate::error::{OrmError, OrmResult};
use crate::models::{Row, Value};
use futures_util::TryStreamExt;
use std::time::Duration;
use tracing::{debug, info};

/// Native positional placeholder syntax of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Question,
    /// `?1`, `?2`, ... (1-based)
    Numbered,
}

impl PlaceholderStyle {
    pub fn for_database(db_type: DatabaseType) -> Self {
        match db_type {
            DatabaseType::MySql => Self::Question,
            DatabaseType::Sqlite => Self::Numbered,
        }
    }
}

/// Rewrite each `?` placeholder into `style`.
///
/// Question marks inside quoted literals or identifiers (`'...'`, `"..."`,
/// `` `...` ``) are left alone. Backslash escapes inside quotes are honored.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut index = 0usize;

    for c in sql.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q != '`' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    index += 1;
                    match style {
                        PlaceholderStyle::Question => out.push('?'),
                        PlaceholderStyle::Numbered => {
                            out.push('?');
                            out.push_str(&index.to_string());
                        }
                    }
                }
                _ => out.push(c),
            },
        }
    }
    out
}

impl DbPool {
    /// Run a query and return its rows in backend order.
    ///
    /// With `size`, at most that many rows are fetched; otherwise all of them.
    /// A mismatch between `args` and the placeholder count is reported by the
    /// backend.
    pub async fn select(&self, sql: &str, args: &[Value], size: Option<usize>) -> OrmResult<Vec<Row>> {
        info!(sql = %sql, args = args.len(), "SQL");
        let native = rewrite_placeholders(sql, PlaceholderStyle::for_database(self.db_type()));

        let rows = match self {
            DbPool::MySql(p) => mysql::fetch_rows(p, &native, args, size).await?,
            DbPool::Sqlite(p) => sqlite::fetch_rows(p, &native, args, size).await?,
        };

        info!(rows = rows.len(), "rows returned");
        Ok(rows)
    }

    /// Run an INSERT, UPDATE or DELETE and return the affected row count.
    pub async fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        info!(sql = %sql, args = args.len(), "SQL");
        let native = rewrite_placeholders(sql, PlaceholderStyle::for_database(self.db_type()));

        let affected = match self {
            DbPool::MySql(p) => mysql::execute_write(p, &native, args).await?,
            DbPool::Sqlite(p) => sqlite::execute_write(p, &native, args).await?,
        };

        debug!(affected, "statement executed");
        Ok(affected)
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

/// Map a failed acquire, reporting the configured wait on timeouts.
fn acquire_error(err: sqlx::Error, acquire_timeout: Duration) -> OrmError {
    match err {
        sqlx::Error::PoolTimedOut => OrmError::timeout(
            "connection pool acquire",
            Some(u32::try_from(acquire_timeout.as_secs()).unwrap_or(u32::MAX)),
        ),
        other => OrmError::from(other),
    }
}

fn reached(rows: usize, size: Option<usize>) -> bool {
    size.is_some_and(|n| rows >= n)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlArguments;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        if size == Some(0) {
            return Ok(Vec::new());
        }
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(e, pool.options().get_acquire_timeout()))?;

        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_param(query, arg);
        }

        let mut rows = Vec::new();
        let mut stream = query.fetch(&mut *conn);
        while let Some(row) = stream.try_next().await? {
            rows.push(row.decode_row()?);
            if reached(rows.len(), size) {
                break;
            }
        }
        Ok(rows)
    }

    pub async fn execute_write(pool: &MySqlPool, sql: &str, args: &[Value]) -> OrmResult<u64> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(e, pool.options().get_acquire_timeout()))?;

        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_param(query, arg);
        }
        let result = query.execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
        param: &'q Value,
    ) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
        match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.as_str()),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteArguments;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        if size == Some(0) {
            return Ok(Vec::new());
        }
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(e, pool.options().get_acquire_timeout()))?;

        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_param(query, arg);
        }

        let mut rows = Vec::new();
        let mut stream = query.fetch(&mut *conn);
        while let Some(row) = stream.try_next().await? {
            rows.push(row.decode_row()?);
            if reached(rows.len(), size) {
                break;
            }
        }
        Ok(rows)
    }

    pub async fn execute_write(pool: &SqlitePool, sql: &str, args: &[Value]) -> OrmResult<u64> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(e, pool.options().get_acquire_timeout()))?;

        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_param(query, arg);
        }
        let result = query.execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
        param: &'q Value,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
        match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.as_str()),
        }
    }
}
