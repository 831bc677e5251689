//! Database driver implementations.
//!
//! Each engine lives in its own module and provides a `Dialect`. Engines
//! with a native client in the dependency tree also provide a `Connection`:
//!
//! - [`postgres`]: PostgreSQL dialect and tokio-postgres connection
//! - [`mssql`]: Microsoft SQL Server dialect
//! - [`mysql`]: MySQL/MariaDB dialect, plus a mysql_async connection behind
//!   the `mysql` feature
//! - [`sqlite`]: SQLite dialect
//! - [`oracle`]: Oracle dialect
//! - [`script`]: a connection that records SQL instead of running it
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` (e.g., `drivers/db2/`)
//! 2. Implement the `Dialect` trait, and `Connection` if a client exists
//! 3. Add a variant to [`DatabaseKind`] and its aliases to `from_db_type`
//! 4. Gate the client behind a feature flag in `Cargo.toml`

pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod script;
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgres::{PostgresConnection, PostgresDialect, SslMode};
pub use script::{ScriptBuffer, ScriptConnection};
pub use sqlite::SqliteDialect;

use crate::config::DatabaseConfig;
use crate::core::traits::{Connection, Dialect};
use crate::error::{MigrateError, Result};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    Postgres,
    Mssql,
    Mysql,
    Sqlite,
    Oracle,
}

impl DatabaseKind {
    /// Resolve a configured database type, accepting common aliases.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mssql" | "sqlserver" | "sql_server" => Ok(Self::Mssql),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "oracle" => Ok(Self::Oracle),
            other => Err(MigrateError::Config(format!(
                "Unknown database type: '{}'. Supported types: postgres, mssql, mysql, sqlite, oracle",
                other
            ))),
        }
    }

    /// Canonical name, as used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mssql => "mssql",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Oracle => "oracle",
        }
    }

    /// Standard server port. SQLite has none and reports 0.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mssql => 1433,
            Self::Mysql => 3306,
            Self::Sqlite => 0,
            Self::Oracle => 1521,
        }
    }

    /// SQL generation strategy for this engine.
    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match self {
            Self::Postgres => Arc::new(PostgresDialect::new()),
            Self::Mssql => Arc::new(MssqlDialect::new()),
            Self::Mysql => Arc::new(MysqlDialect::new()),
            Self::Sqlite => Arc::new(SqliteDialect::new()),
            Self::Oracle => Arc::new(OracleDialect::new()),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open a native connection for the configured database.
///
/// Only engines whose client is compiled in can connect; the rest fail with
/// [`MigrateError::Unsupported`] and can still be scripted.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn Connection>> {
    match config.kind()? {
        DatabaseKind::Postgres => Ok(Box::new(PostgresConnection::connect(config).await?)),
        #[cfg(feature = "mysql")]
        DatabaseKind::Mysql => Ok(Box::new(mysql::MysqlConnection::connect(config).await?)),
        #[cfg(not(feature = "mysql"))]
        DatabaseKind::Mysql => Err(MigrateError::Unsupported(
            "mysql connections require the 'mysql' feature".into(),
        )),
        other => Err(MigrateError::Unsupported(format!(
            "no {} client is built in; use the script command to generate SQL",
            other
        ))),
    }
}
