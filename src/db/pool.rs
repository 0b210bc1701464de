//! Connection pool management.
//!
//! [`DbPool`] is the explicit pool handle every query goes through. It is
//! created once at startup and cloned (cheaply, it is reference counted) into
//! whatever issues queries. At most `maxsize` connections are checked out at
//! a time; further callers wait in line until one is released.

use crate::config::{PoolConfig, SqliteConfig};
use crate::db::macros::DatabaseType;
use crate::error::{OrmError, OrmResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, MySqlPool, SqlitePool};
use std::str::FromStr;
use tracing::info;

/// Backend-specific connection pool.
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    /// Create the MySQL pool described by `config`.
    ///
    /// Suspends until `minsize` connections are established. A connection
    /// failure is returned as-is; nothing is retried.
    pub async fn create(config: &PoolConfig) -> OrmResult<Self> {
        config.validate()?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            minsize = config.minsize,
            maxsize = config.maxsize,
            "create database connection pool"
        );

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .charset(&config.charset);

        let mut pool_options = MySqlPoolOptions::new()
            .min_connections(config.minsize)
            .max_connections(config.maxsize)
            .acquire_timeout(config.acquire_timeout());

        if !config.autocommit {
            pool_options = pool_options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET autocommit = 0").await?;
                    Ok(())
                })
            });
        }

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            OrmError::connection(
                format!("Failed to connect: {}", e),
                connection_suggestion(DatabaseType::MySql, &e),
            )
        })?;

        info!(maxsize = config.maxsize, "database connection pool ready");
        Ok(DbPool::MySql(pool))
    }

    /// Create a pool over an SQLite file, creating the file if missing.
    pub async fn connect_sqlite(config: &SqliteConfig) -> OrmResult<Self> {
        config.validate()?;
        info!(
            url = %config.url,
            minsize = config.minsize,
            maxsize = config.maxsize,
            "create sqlite connection pool"
        );

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                OrmError::connection(
                    format!("Invalid SQLite connection string: {}", e),
                    "Check the connection URL format: sqlite:path/to/db.sqlite",
                )
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(config.minsize)
            .max_connections(config.maxsize)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                OrmError::connection(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(DatabaseType::Sqlite, &e),
                )
            })?;

        Ok(DbPool::Sqlite(pool))
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::MySql(_) => DatabaseType::MySql,
            DbPool::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Number of open connections, idle or checked out.
    pub fn size(&self) -> u32 {
        impl_db_dispatch!(self, {
            MySql(p) => p.size(),
            Sqlite(p) => p.size(),
        })
    }

    /// Number of open connections not currently checked out.
    pub fn num_idle(&self) -> usize {
        impl_db_dispatch!(self, {
            MySql(p) => p.num_idle(),
            Sqlite(p) => p.num_idle(),
        })
    }

    pub fn max_size(&self) -> u32 {
        impl_db_dispatch!(self, {
            MySql(p) => p.options().get_max_connections(),
            Sqlite(p) => p.options().get_max_connections(),
        })
    }

    pub fn is_closed(&self) -> bool {
        impl_db_dispatch!(self, {
            MySql(p) => p.is_closed(),
            Sqlite(p) => p.is_closed(),
        })
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        info!(db_type = %self.db_type(), "closing connection pool");
        impl_db_dispatch!(self, {
            MySql(p) => p.close().await,
            Sqlite(p) => p.close().await,
        })
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("access denied")
        || error_str.contains("authentication")
        || error_str.contains("password")
    {
        return "Verify the user and password".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    match db_type {
        DatabaseType::MySql => "Verify host, port, user, password and database".to_string(),
        DatabaseType::Sqlite => {
            "Verify the file path is accessible: sqlite:path/to/db.sqlite".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_suggestion_refused() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection refused",
        ));
        let suggestion = connection_suggestion(DatabaseType::MySql, &err);
        assert!(suggestion.contains("MySQL server is running"));
    }

    #[test]
    fn test_connection_suggestion_fallback() {
        let err = sqlx::Error::Protocol("odd".to_string());
        let suggestion = connection_suggestion(DatabaseType::MySql, &err);
        assert!(suggestion.contains("host, port"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config() {
        let mut config = PoolConfig::new("u", "p", "db");
        config.minsize = 3;
        config.maxsize = 1;
        let result = DbPool::create(&config).await;
        assert!(matches!(result, Err(OrmError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_create_unreachable_server_fails() {
        let mut config = PoolConfig::new("u", "p", "db");
        config.host = "127.0.0.1".to_string();
        config.port = 1;
        config.acquire_timeout_secs = 2;
        let result = DbPool::create(&config).await;
        assert!(matches!(
            result,
            Err(OrmError::Connection { .. })
        ));
    }
}
