//! Error types for the ORM.
//!
//! All fallible operations return [`OrmResult`]. Variants carry enough context
//! (and, where it helps, a suggestion) for the caller to act on the failure.
//! A missing row is not an error: lookups return `Ok(None)` instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrmError {
    /// Model declaration is unusable (missing or duplicate primary key, bad field).
    #[error("Schema error in model '{model}': {message}")]
    Schema { model: String, message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {}", display_secs(.elapsed_secs))]
    Timeout {
        operation: String,
        /// `None` when the configured wait is not known at the failure site
        elapsed_secs: Option<u32>,
    },

    #[error("Invalid limit: {message}")]
    InvalidLimit { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl OrmError {
    /// Create a schema definition error.
    pub fn schema(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: Option<u32>) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn invalid_limit(message: impl Into<String>) -> Self {
        Self::InvalidLimit {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQLSTATE reported by the backend, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

fn display_secs(secs: &Option<u32>) -> String {
    match secs {
        Some(secs) => format!("{}s", secs),
        None => "the configured wait".to_string(),
    }
}

/// Convert sqlx errors to OrmError.
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => OrmError::connection(
                msg.to_string(),
                "Check the connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                OrmError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax, referenced tables and argument count",
                )
            }
            sqlx::Error::RowNotFound => OrmError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => OrmError::timeout("connection pool acquire", None),
            sqlx::Error::PoolClosed => OrmError::connection(
                "Connection pool is closed",
                "Create a new pool before issuing queries",
            ),
            sqlx::Error::Io(io_err) => OrmError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => OrmError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => OrmError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                OrmError::decode(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => OrmError::decode(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                OrmError::decode(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => OrmError::decode(format!("{}", source)),
            sqlx::Error::WorkerCrashed => OrmError::internal("Database worker crashed"),
            _ => OrmError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for ORM operations.
pub type OrmResult<T> = Result<T, OrmError>;
