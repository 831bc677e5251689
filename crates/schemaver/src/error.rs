//! Error types for the migration library.

use thiserror::Error;

/// Boxed driver error carried as the cause of a [`MigrateError::Sql`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ambiguous or unreachable migration history.
    #[error("{message}: {}", join_versions(.versions))]
    Version { message: String, versions: Vec<i64> },

    /// Two or more non-ignored migrations share a version.
    #[error("Migration version #{} is duplicated", join_versions(.0))]
    DuplicatedVersion(Vec<i64>),

    /// The plan reached a version with no registered migration.
    #[error("Migration not found: {0}")]
    NotFound(i64),

    /// The dialect explicitly refuses an operation.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// No type mapping is registered for an abstract column type.
    #[error("No type mapping registered for {0}")]
    UnsupportedType(String),

    /// Opening or using the native connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: BoxError,
    },

    /// A statement failed in the driver.
    #[error("SQL execution failed: {message}\n  SQL: {sql}")]
    Sql {
        message: String,
        sql: String,
        #[source]
        source: BoxError,
    },

    /// Invalid construction or call arguments.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Failure raised by migration code itself.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_versions(versions: &[i64]) -> String {
    versions
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl MigrateError {
    /// Wrap a driver error raised while running `sql`.
    pub fn sql<E>(sql: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MigrateError::Sql {
            message: err.to_string(),
            sql: sql.into(),
            source: Box::new(err),
        }
    }

    /// Wrap a driver error raised while connecting.
    pub fn connection<E>(message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MigrateError::Connection {
            message: message.into(),
            source: Box::new(err),
        }
    }

    /// Create a Version error listing the offending versions.
    pub fn version(message: impl Into<String>, versions: Vec<i64>) -> Self {
        MigrateError::Version {
            message: message.into(),
            versions,
        }
    }

    /// Create an Unsupported error naming the dialect and operation.
    pub fn unsupported(dialect: &str, operation: &str) -> Self {
        MigrateError::Unsupported(format!("{} does not support {}", dialect, operation))
    }

    /// Process exit code used by the command-line runner.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 1,
            MigrateError::Version { .. } | MigrateError::DuplicatedVersion(_) => 2,
            MigrateError::NotFound(_) => 3,
            MigrateError::Unsupported(_) | MigrateError::UnsupportedType(_) => 4,
            MigrateError::Connection { .. } | MigrateError::Sql { .. } => 5,
            MigrateError::Argument(_) | MigrateError::Migration(_) => 6,
            MigrateError::Io(_) | MigrateError::Json(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
