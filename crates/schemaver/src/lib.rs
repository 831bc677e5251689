//! # schemaver
//!
//! Versioned, reversible schema migrations across SQL dialects.
//!
//! This library tracks which migrations a database has applied and moves it,
//! step by step, to a requested version:
//!
//! - **Planning** that orders forward and backward moves and refuses
//!   ambiguous histories
//! - **Transactional steps** with rollback on failure
//! - **Portable DDL** rendered per engine (PostgreSQL, SQL Server, MySQL,
//!   SQLite, Oracle)
//! - **SQL script migrations** loaded from a directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use schemaver::{load_directory, Config, MigrationCatalog, Migrator, TransformationProvider};
//!
//! #[tokio::main]
//! async fn main() -> schemaver::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let provider = TransformationProvider::connect(&config).await?;
//!     let descriptors = load_directory(&config.migrations.directory)?;
//!     let catalog = MigrationCatalog::new(config.migrations.key.clone(), descriptors)?;
//!
//!     let mut migrator = Migrator::new(provider, catalog);
//!     let report = migrator.migrate(None).await?;
//!     println!("Now at version {}", report.final_version);
//!     migrator.close().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod migration;
pub mod observer;
pub mod provider;
pub mod typemap;

#[cfg(test)]
mod test_support;

// Re-exports for convenient access
pub use crate::core::{
    Column, ColumnProperty, ColumnType, Connection, DbType, DefaultValue, Dialect,
    ForeignKeyAction, Migration, ObjectName, Row, RowValues,
};
pub use config::{Config, DatabaseConfig, MigrationsConfig};
pub use drivers::{DatabaseKind, ScriptBuffer, ScriptConnection};
pub use error::{MigrateError, Result};
pub use migration::{
    build_plan, load_directory, to_human_name, Direction, ListEntry, MigrationCatalog,
    MigrationDescriptor, MigrationPlan, MigrationReport, MigrationStep, Migrator,
    SqlScriptMigration,
};
pub use observer::{MigrationObserver, NullObserver, TracingObserver};
pub use provider::TransformationProvider;
pub use typemap::TypeMap;
