//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::time::Duration;

use crate::drivers::DatabaseKind;
use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl DatabaseConfig {
    /// Engine selected by `type`.
    pub fn kind(&self) -> Result<DatabaseKind> {
        DatabaseKind::from_db_type(&self.r#type)
    }

    /// Configured port, or the engine's standard port.
    pub fn port_or_default(&self) -> Result<u16> {
        match self.port {
            Some(port) => Ok(port),
            None => Ok(self.kind()?.default_port()),
        }
    }
}

impl MigrationsConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(
            r#"
database:
  type: postgresql
  host: localhost
  database: app
  user: app
"#,
        )
        .unwrap();
        assert_eq!(config.database.kind().unwrap(), DatabaseKind::Postgres);
        assert_eq!(config.database.port_or_default().unwrap(), 5432);
        assert_eq!(config.database.ssl_mode, "require");
        assert_eq!(config.migrations.directory, Path::new("migrations"));
        assert_eq!(config.migrations.key, "");
        assert_eq!(config.migrations.ledger_table, "SchemaInfo");
        assert!(config.migrations.command_timeout().is_none());
        assert!(config.migrations.target_version.is_none());
    }

    #[test]
    fn test_from_yaml_reads_migrations_section() {
        let config = Config::from_yaml(
            r#"
database:
  type: sqlserver
  host: db
  port: 11433
  database: app
  user: sa
  password: secret
migrations:
  directory: db/migrations
  key: billing
  ledger_table: schema_versions
  command_timeout_secs: 45
  target_version: 12
"#,
        )
        .unwrap();
        assert_eq!(config.database.kind().unwrap(), DatabaseKind::Mssql);
        assert_eq!(config.database.port_or_default().unwrap(), 11433);
        assert_eq!(config.migrations.key, "billing");
        assert_eq!(config.migrations.ledger_table, "schema_versions");
        assert_eq!(
            config.migrations.command_timeout(),
            Some(Duration::from_secs(45))
        );
        assert_eq!(config.migrations.target_version, Some(12));
    }

    #[test]
    fn test_from_yaml_rejects_invalid() {
        let err = Config::from_yaml("database:\n  type: postgres\n").unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));

        let err = Config::from_yaml("database: [").unwrap_err();
        assert!(matches!(err, MigrateError::Yaml(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/schemaver.yaml").unwrap_err();
        assert!(matches!(err, MigrateError::Io(_)));
    }
}
