//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::drivers::{DatabaseKind, SslMode};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let kind = DatabaseKind::from_db_type(&config.database.r#type)?;

    // Connection validation; a connection string supplies everything
    if config.database.connection_string.is_none() {
        if config.database.database.is_empty() {
            return Err(MigrateError::Config("database.database is required".into()));
        }
        if kind != DatabaseKind::Sqlite {
            if config.database.host.is_empty() {
                return Err(MigrateError::Config("database.host is required".into()));
            }
            if config.database.user.is_empty() {
                return Err(MigrateError::Config("database.user is required".into()));
            }
        }
    }
    if let Some(0) = config.database.port {
        return Err(MigrateError::Config("database.port must be at least 1".into()));
    }
    config.database.ssl_mode.parse::<SslMode>()?;

    // Migrations validation
    validate_identifier(&config.migrations.ledger_table).map_err(|_| {
        MigrateError::Config(format!(
            "migrations.ledger_table '{}' is not a valid identifier",
            config.migrations.ledger_table
        ))
    })?;
    if let Some(0) = config.migrations.command_timeout_secs {
        return Err(MigrateError::Config(
            "migrations.command_timeout_secs must be at least 1".into(),
        ));
    }
    if let Some(target) = config.migrations.target_version {
        if target < 0 {
            return Err(MigrateError::Config(format!(
                "migrations.target_version must not be negative, got {}",
                target
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, MigrationsConfig};

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                r#type: "postgres".to_string(),
                host: "localhost".to_string(),
                port: Some(5432),
                database: "app".to_string(),
                user: "postgres".to_string(),
                password: "password".to_string(),
                ssl_mode: "disable".to_string(),
                connection_string: None,
            },
            migrations: MigrationsConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.database.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_string_replaces_fields() {
        let mut config = valid_config();
        config.database.host = "".to_string();
        config.database.user = "".to_string();
        config.database.connection_string = Some("host=db user=app dbname=app".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_sqlite_needs_no_host() {
        let mut config = valid_config();
        config.database.r#type = "sqlite".to_string();
        config.database.host = "".to_string();
        config.database.user = "".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_type() {
        let mut config = valid_config();
        config.database.r#type = "db2".to_string();
        assert!(matches!(validate(&config), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.database.ssl_mode = "maybe".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = valid_config();
        config.migrations.command_timeout_secs = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_ledger_table() {
        let mut config = valid_config();
        config.migrations.ledger_table = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let mut config = valid_config();
        config.database.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.database);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
