//! Migration lifecycle events.
//!
//! The executor reports progress through [`MigrationObserver`]. The default
//! [`TracingObserver`] turns every event into a `tracing` record, so output
//! follows whatever subscriber the host installed.

use tracing::{debug, error, info, trace, warn};

/// Receiver for migration lifecycle events. Every method defaults to a no-op.
pub trait MigrationObserver: Send + Sync {
    /// A run starts from `current` towards `target`.
    fn started(&self, current: i64, target: i64) {
        let _ = (current, target);
    }

    fn migrate_up(&self, version: i64, name: &str) {
        let _ = (version, name);
    }

    fn migrate_down(&self, version: i64, name: &str) {
        let _ = (version, name);
    }

    /// A statement is about to run.
    fn executing_sql(&self, sql: &str) {
        let _ = sql;
    }

    /// Migration `version` failed.
    fn exception(&self, version: i64, name: &str, err: &dyn std::error::Error) {
        let _ = (version, name, err);
    }

    /// The ledger stays at `version` after a failure.
    fn rolling_back(&self, version: i64) {
        let _ = version;
    }

    fn rollback_failed(&self, err: &dyn std::error::Error) {
        let _ = err;
    }

    fn commit_failed(&self, err: &dyn std::error::Error) {
        let _ = err;
    }

    /// The run moved the ledger from `from` to `to`.
    fn finished(&self, from: i64, to: i64) {
        let _ = (from, to);
    }

    /// A catalog was loaded for `key`, as `(version, display name)` pairs.
    fn loaded_migrations(&self, key: &str, migrations: &[(i64, String)]) {
        let _ = (key, migrations);
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl MigrationObserver for NullObserver {}

/// Observer that logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn started(&self, current: i64, target: i64) {
        info!("Latest version applied : {}.  Target version : {}", current, target);
    }

    fn migrate_up(&self, version: i64, name: &str) {
        info!("Applying {}: {}", version, name);
    }

    fn migrate_down(&self, version: i64, name: &str) {
        info!("Removing {}: {}", version, name);
    }

    fn executing_sql(&self, sql: &str) {
        trace!("{}", sql);
    }

    fn exception(&self, version: i64, name: &str, err: &dyn std::error::Error) {
        error!("Error in migration: {}", version);
        error!("{} ({}): {}", version, name, err);
    }

    fn rolling_back(&self, version: i64) {
        warn!("Rolling back to migration {}", version);
    }

    fn rollback_failed(&self, err: &dyn std::error::Error) {
        error!("Rollback failed: {}", err);
    }

    fn commit_failed(&self, err: &dyn std::error::Error) {
        error!("Commit failed: {}", err);
    }

    fn finished(&self, _from: i64, to: i64) {
        info!("Migrated to version {}", to);
    }

    fn loaded_migrations(&self, key: &str, migrations: &[(i64, String)]) {
        debug!("Migration key: {}", key);
        debug!("Loaded migrations:");
        for (version, name) in migrations {
            debug!("{:>5} {}", version, name);
        }
    }
}
