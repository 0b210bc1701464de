//! Backend dispatch helpers.
//!
//! [`DatabaseType`] names the backend behind a pool; [`impl_db_dispatch!`]
//! expands to a `match` over the `DbPool` variants so per-backend code reads
//! linearly.

/// Database backend behind a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    MySql,
    /// Embedded target that accepts the same SQL text
    Sqlite,
}

impl DatabaseType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => p.size(),
///     Sqlite(p) => p.size(),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
