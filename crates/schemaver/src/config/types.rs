//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database the migrations run against.
    pub database: DatabaseConfig,

    /// Migration discovery and execution settings.
    #[serde(default)]
    pub migrations: MigrationsConfig,
}

/// Target database configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database type ("postgres", "mssql", "mysql", "sqlite", "oracle" or an alias).
    #[serde(default = "default_postgres")]
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port. Defaults to the engine's standard port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// Driver connection string. Overrides the individual fields when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Migration discovery and execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Directory holding `<version>_<name>.up.sql` scripts (default: "migrations").
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Key partitioning the ledger between independent migration sets (default: "").
    #[serde(default)]
    pub key: String,

    /// Ledger table name (default: "SchemaInfo").
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Per-statement timeout in seconds. Unlimited if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    /// Version to migrate to. Latest available if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<i64>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            key: String::new(),
            ledger_table: default_ledger_table(),
            command_timeout_secs: None,
            target_version: None,
        }
    }
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_require() -> String {
    "require".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_ledger_table() -> String {
    "SchemaInfo".to_string()
}
