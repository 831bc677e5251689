//! Migration executor - runs a plan against one provider.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::observer::MigrationObserver;
use crate::provider::TransformationProvider;

use super::catalog::MigrationCatalog;
use super::plan::{build_plan, MigrationPlan};

/// Whether a step applied or reverted its migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub version: i64,
    pub name: String,
    pub direction: Direction,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Series key of the catalog.
    pub key: String,

    /// Highest applied version before the run.
    pub start_version: i64,

    /// Requested version.
    pub target_version: i64,

    /// Highest applied version after the run.
    pub final_version: i64,

    /// Steps in execution order.
    pub steps: Vec<MigrationStep>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

/// A catalog entry with its applied state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub version: i64,
    pub name: String,
    pub applied: bool,
    pub without_transaction: bool,
}

/// Drives a provider through the catalog's migrations.
///
/// Steps run strictly one after another. Each step runs in its own
/// transaction unless its descriptor opts out, and the ledger is updated
/// inside that transaction, so a failed step leaves the database at the last
/// recorded version.
pub struct Migrator {
    provider: TransformationProvider,
    catalog: MigrationCatalog,
    observer: Arc<dyn MigrationObserver>,
}

impl Migrator {
    /// Create a migrator reporting through the provider's observer.
    pub fn new(provider: TransformationProvider, catalog: MigrationCatalog) -> Self {
        let observer = provider.observer();
        observer.loaded_migrations(catalog.key(), &catalog.summary());
        Self {
            provider,
            catalog,
            observer,
        }
    }

    /// Report to `observer`, for both run events and executed SQL. The
    /// catalog listing is sent again so the new observer sees it too.
    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        observer.loaded_migrations(self.catalog.key(), &self.catalog.summary());
        self.provider = self.provider.with_observer(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    pub fn provider(&mut self) -> &mut TransformationProvider {
        &mut self.provider
    }

    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    /// Versions recorded in the ledger for this catalog's key.
    pub async fn applied_versions(&mut self) -> Result<Vec<i64>> {
        let key = self.catalog.key().to_string();
        self.provider.get_applied_migrations(&key).await
    }

    /// Target to use when none is given: the latest registered version.
    fn resolve_target(&self, target: Option<i64>) -> Result<i64> {
        match target {
            Some(v) if v < 0 => Err(MigrateError::Argument(format!(
                "Target version must not be negative: {}",
                v
            ))),
            Some(v) => Ok(v),
            None => Ok(self.catalog.latest_version()),
        }
    }

    /// The plan a [`migrate`](Self::migrate) call would execute.
    pub async fn plan(&mut self, target: Option<i64>) -> Result<MigrationPlan> {
        let target = self.resolve_target(target)?;
        let applied = self.applied_versions().await?;
        build_plan(target, &applied, &self.catalog.versions())
    }

    /// Move the database to `target`, or to the latest version when `None`.
    pub async fn migrate(&mut self, target: Option<i64>) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let target_version = self.resolve_target(target)?;
        let applied = self.applied_versions().await?;
        let plan = build_plan(target_version, &applied, &self.catalog.versions())?;
        debug!("Plan from {}: {:?}", plan.start_version, plan.versions);

        self.observer.started(plan.start_version, target_version);

        let mut applied: BTreeSet<i64> = applied.into_iter().collect();
        let mut current = plan.start_version;
        let mut steps = Vec::with_capacity(plan.len());

        for &version in &plan.versions {
            let step = self.execute_migration(version, current).await?;
            match step.direction {
                Direction::Up => applied.insert(version),
                Direction::Down => applied.remove(&version),
            };
            steps.push(step);
            current = version;
        }

        let final_version = applied.iter().next_back().copied().unwrap_or(0);
        self.observer.finished(plan.start_version, final_version);

        Ok(MigrationReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            key: self.catalog.key().to_string(),
            start_version: plan.start_version,
            target_version,
            final_version,
            steps,
            started_at,
            finished_at: Utc::now(),
            duration_seconds: timer.elapsed().as_secs_f64(),
        })
    }

    /// Execute one step. `version <= current` reverts it, anything else
    /// applies it.
    pub async fn execute_migration(&mut self, version: i64, current: i64) -> Result<MigrationStep> {
        let descriptor = self.catalog.get(version)?;
        let transactional = !descriptor.runs_without_transaction();
        let direction = if version <= current {
            Direction::Down
        } else {
            Direction::Up
        };
        let key = self.catalog.key().to_string();
        let observer = Arc::clone(&self.observer);

        let mut migration = self.catalog.instantiate(descriptor, &mut self.provider);
        let name = migration.name().to_string();

        let outcome = async {
            if transactional {
                migration.provider().begin_transaction().await?;
            }
            match direction {
                Direction::Down => {
                    observer.migrate_down(version, &name);
                    migration.revert().await?;
                    migration.provider().migration_unapplied(version, &key).await?;
                }
                Direction::Up => {
                    observer.migrate_up(version, &name);
                    migration.apply().await?;
                    migration.provider().migration_applied(version, &key).await?;
                }
            }
            Ok::<(), MigrateError>(())
        }
        .await;

        if let Err(err) = outcome {
            observer.exception(version, &name, &err);
            if transactional {
                if let Err(rollback_err) = migration.provider().rollback().await {
                    observer.rollback_failed(&rollback_err);
                }
                observer.rolling_back(current);
            }
            return Err(err);
        }

        if transactional {
            if let Err(err) = migration.provider().commit().await {
                observer.commit_failed(&err);
                if let Err(rollback_err) = migration.provider().rollback().await {
                    observer.rollback_failed(&rollback_err);
                }
                observer.rolling_back(current);
                return Err(err);
            }
        }

        Ok(MigrationStep {
            version,
            name,
            direction,
        })
    }

    /// Every catalog entry with whether the ledger records it.
    pub async fn list(&mut self) -> Result<Vec<ListEntry>> {
        let applied: BTreeSet<i64> = self.applied_versions().await?.into_iter().collect();
        Ok(self
            .catalog
            .iter()
            .map(|d| ListEntry {
                version: d.version(),
                name: d.display_name(),
                applied: applied.contains(&d.version()),
                without_transaction: d.runs_without_transaction(),
            })
            .collect())
    }

    /// Close the provider's connection if it owns it.
    pub async fn close(&mut self) -> Result<()> {
        self.provider.close().await
    }

    pub fn into_provider(self) -> TransformationProvider {
        self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::schema::{Column, ColumnType, DbType, ObjectName};
    use crate::core::traits::Migration;
    use crate::drivers::PostgresDialect;
    use crate::migration::MigrationDescriptor;
    use crate::observer::recording::RecordingObserver;
    use crate::test_support::MockConnection;

    struct CreateTable(&'static str);

    #[async_trait]
    impl Migration for CreateTable {
        fn name(&self) -> String {
            format!("Create {}", self.0)
        }

        async fn apply(&self, db: &mut TransformationProvider) -> Result<()> {
            db.add_table(
                &ObjectName::new(self.0),
                &[Column::new("id", ColumnType::new(DbType::Int32))],
            )
            .await
        }

        async fn revert(&self, db: &mut TransformationProvider) -> Result<()> {
            db.remove_table(&ObjectName::new(self.0)).await
        }
    }

    /// Changes something, then fails.
    struct Broken;

    #[async_trait]
    impl Migration for Broken {
        async fn apply(&self, db: &mut TransformationProvider) -> Result<()> {
            db.execute_non_query("UPDATE side_effect SET applied = 1").await?;
            Err(MigrateError::Migration("apply exploded".into()))
        }

        async fn revert(&self, db: &mut TransformationProvider) -> Result<()> {
            db.execute_non_query("UPDATE side_effect SET reverted = 1").await?;
            Err(MigrateError::Migration("revert exploded".into()))
        }
    }

    fn migrator(
        conn: &MockConnection,
        descriptors: Vec<MigrationDescriptor>,
    ) -> (Migrator, RecordingObserver) {
        let provider =
            TransformationProvider::new(Arc::new(PostgresDialect::new()), Box::new(conn.clone()));
        let catalog = MigrationCatalog::new("", descriptors).unwrap();
        let observer = RecordingObserver::default();
        let migrator = Migrator::new(provider, catalog).with_observer(Arc::new(observer.clone()));
        (migrator, observer)
    }

    fn tables(versions: &[(i64, &'static str)]) -> Vec<MigrationDescriptor> {
        versions
            .iter()
            .map(|(v, t)| MigrationDescriptor::new(*v, CreateTable(t)))
            .collect()
    }

    #[tokio::test]
    async fn test_migrate_to_latest() {
        let conn = MockConnection::new();
        let (mut m, observer) = migrator(&conn, tables(&[(1, "a"), (2, "b")]));

        let report = m.migrate(None).await.unwrap();

        assert_eq!(report.start_version, 0);
        assert_eq!(report.target_version, 2);
        assert_eq!(report.final_version, 2);
        assert_eq!(
            report.steps,
            vec![
                MigrationStep { version: 1, name: "Create a".into(), direction: Direction::Up },
                MigrationStep { version: 2, name: "Create b".into(), direction: Direction::Up },
            ]
        );
        assert_eq!(conn.applied(""), vec![1, 2]);
        assert_eq!(
            conn.transaction_events(),
            vec!["BEGIN", "COMMIT", "BEGIN", "COMMIT"]
        );
        assert_eq!(
            observer.events(),
            vec!["started 0 -> 2", "up 1 Create a", "up 2 Create b", "finished 0 -> 2"]
        );
    }

    #[tokio::test]
    async fn test_injected_observer_receives_catalog_listing() {
        let conn = MockConnection::new();
        let (_m, observer) = migrator(&conn, tables(&[(2, "b"), (1, "a")]));

        assert_eq!(observer.loaded(), vec!["\"\": 1 Create a, 2 Create b"]);
        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_forward_then_back_restores_ledger() {
        let conn = MockConnection::new();
        conn.seed_applied("", &[1]);
        let (mut m, _) = migrator(&conn, tables(&[(1, "a"), (2, "b"), (3, "c")]));

        m.migrate(Some(3)).await.unwrap();
        assert_eq!(conn.applied(""), vec![1, 2, 3]);

        let report = m.migrate(Some(1)).await.unwrap();
        assert_eq!(conn.applied(""), vec![1]);
        assert_eq!(report.final_version, 1);
        assert_eq!(
            report.steps.iter().map(|s| (s.version, s.direction)).collect::<Vec<_>>(),
            vec![(3, Direction::Down), (2, Direction::Down)]
        );
        assert!(conn.executed().contains(&"DROP TABLE \"c\"".to_string()));
    }

    #[tokio::test]
    async fn test_transactional_failure_rolls_back() {
        let conn = MockConnection::new();
        conn.set_ledger_exists(true);
        let (mut m, observer) = migrator(&conn, vec![MigrationDescriptor::new(1, Broken)]);

        let err = m.migrate(None).await.unwrap_err();

        assert!(matches!(err, MigrateError::Migration(ref msg) if msg == "apply exploded"));
        assert_eq!(conn.transaction_events(), vec!["BEGIN", "ROLLBACK"]);
        assert!(conn.applied("").is_empty());
        assert!(!conn.executed().iter().any(|sql| sql.starts_with("INSERT")));
        assert_eq!(
            observer.events(),
            vec!["started 0 -> 1", "up 1 Broken", "error 1", "rolling back to 0"]
        );
    }

    #[tokio::test]
    async fn test_without_transaction_failure_keeps_effects() {
        let conn = MockConnection::new();
        conn.seed_applied("", &[1, 2]);
        let (mut m, observer) = migrator(
            &conn,
            vec![
                MigrationDescriptor::new(1, CreateTable("a")),
                MigrationDescriptor::new(2, Broken).without_transaction(true),
            ],
        );

        let err = m.migrate(Some(1)).await.unwrap_err();

        assert!(matches!(err, MigrateError::Migration(ref msg) if msg == "revert exploded"));
        assert!(conn.transaction_events().is_empty());
        assert_eq!(conn.executed(), vec!["UPDATE side_effect SET reverted = 1"]);
        assert_eq!(conn.applied(""), vec![1, 2]);
        assert!(!observer.events().iter().any(|e| e.starts_with("rolling back")));
    }

    #[tokio::test]
    async fn test_rollback_failure_does_not_mask_error() {
        let conn = MockConnection::new();
        conn.set_ledger_exists(true);
        conn.fail_rollback(true);
        let (mut m, observer) = migrator(&conn, vec![MigrationDescriptor::new(1, Broken)]);

        let err = m.migrate(None).await.unwrap_err();

        assert!(matches!(err, MigrateError::Migration(_)));
        assert!(observer.events().contains(&"rollback failed".to_string()));
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back_and_propagates() {
        let conn = MockConnection::new();
        conn.set_ledger_exists(true);
        conn.fail_commit(true);
        let (mut m, observer) = migrator(&conn, tables(&[(1, "a")]));

        let err = m.migrate(None).await.unwrap_err();

        assert!(matches!(err, MigrateError::Sql { ref sql, .. } if sql == "COMMIT"));
        assert_eq!(conn.transaction_events(), vec!["BEGIN", "COMMIT", "ROLLBACK"]);
        assert!(conn.applied("").is_empty());
        assert!(observer.events().contains(&"commit failed".to_string()));
        assert!(!m.provider().in_transaction());
    }

    #[tokio::test]
    async fn test_mid_plan_failure_keeps_recorded_version() {
        let conn = MockConnection::new();
        let (mut m, _) = migrator(
            &conn,
            vec![
                MigrationDescriptor::new(1, CreateTable("a")),
                MigrationDescriptor::new(2, Broken),
                MigrationDescriptor::new(3, CreateTable("c")),
            ],
        );

        assert!(m.migrate(None).await.is_err());
        assert_eq!(conn.applied(""), vec![1]);
        assert!(!conn.executed().contains(&"CREATE TABLE \"c\" (\"id\" int4)".to_string()));
    }

    #[tokio::test]
    async fn test_missing_descriptor_fails_before_executing() {
        let conn = MockConnection::new();
        conn.seed_applied("", &[1, 2]);
        let (mut m, _) = migrator(&conn, tables(&[(1, "a")]));

        let err = m.migrate(Some(0)).await.unwrap_err();

        assert!(matches!(err, MigrateError::NotFound(2)));
        assert!(conn.transaction_events().is_empty());
        assert!(conn.executed().is_empty());
        assert_eq!(conn.applied(""), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_ambiguous_history_executes_nothing() {
        let conn = MockConnection::new();
        conn.seed_applied("", &[1, 4]);
        let (mut m, _) = migrator(&conn, tables(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]));

        let err = m.migrate(None).await.unwrap_err();
        assert!(matches!(err, MigrateError::Version { ref versions, .. } if *versions == vec![2, 3]));
        assert!(conn.executed().is_empty());
    }

    #[tokio::test]
    async fn test_negative_target_rejected() {
        let conn = MockConnection::new();
        let (mut m, _) = migrator(&conn, tables(&[(1, "a")]));
        assert!(matches!(m.migrate(Some(-1)).await, Err(MigrateError::Argument(_))));
    }

    #[tokio::test]
    async fn test_plan_does_not_execute() {
        let conn = MockConnection::new();
        conn.seed_applied("", &[1]);
        let (mut m, _) = migrator(&conn, tables(&[(1, "a"), (2, "b")]));

        let plan = m.plan(None).await.unwrap();
        assert_eq!(plan.start_version, 1);
        assert_eq!(plan.versions, vec![2]);
        assert!(conn.executed().is_empty());
    }

    #[tokio::test]
    async fn test_list_marks_applied() {
        let conn = MockConnection::new();
        conn.seed_applied("", &[1]);
        let (mut m, _) = migrator(&conn, tables(&[(1, "a"), (2, "b")]));

        let entries = m.list().await.unwrap();
        assert_eq!(
            entries
                .iter()
                .map(|e| (e.version, e.applied))
                .collect::<Vec<_>>(),
            vec![(1, true), (2, false)]
        );
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let conn = MockConnection::new();
        conn.seed_applied("billing", &[1, 2, 3]);
        let (mut m, _) = migrator(&conn, tables(&[(1, "a")]));

        m.migrate(None).await.unwrap();
        assert_eq!(conn.applied(""), vec![1]);
        assert_eq!(conn.applied("billing"), vec![1, 2, 3]);
    }

    #[test]
    fn test_report_serializes_direction_lowercase() {
        let step = MigrationStep {
            version: 4,
            name: "Add index".into(),
            direction: Direction::Down,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["direction"], "down");
    }
}
