//! Migration descriptors and the per-key catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::traits::Migration;
use crate::error::{MigrateError, Result};
use crate::provider::TransformationProvider;

/// One registered migration: its version, run flags and implementation.
#[derive(Clone)]
pub struct MigrationDescriptor {
    version: i64,
    ignore: bool,
    without_transaction: bool,
    name: Option<String>,
    migration: Arc<dyn Migration>,
}

impl MigrationDescriptor {
    pub fn new(version: i64, migration: impl Migration + 'static) -> Self {
        Self::from_arc(version, Arc::new(migration))
    }

    pub fn from_arc(version: i64, migration: Arc<dyn Migration>) -> Self {
        Self {
            version,
            ignore: false,
            without_transaction: false,
            name: None,
            migration,
        }
    }

    /// Leave this migration out of the catalog entirely.
    pub fn ignored(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    /// Run this migration outside a transaction. A failure then leaves
    /// whatever it already changed in place.
    pub fn without_transaction(mut self, without_transaction: bool) -> Self {
        self.without_transaction = without_transaction;
        self
    }

    /// Override the name reported by the migration itself.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    pub fn runs_without_transaction(&self) -> bool {
        self.without_transaction
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.migration.name())
    }
}

impl fmt::Debug for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDescriptor")
            .field("version", &self.version)
            .field("ignore", &self.ignore)
            .field("without_transaction", &self.without_transaction)
            .field("name", &self.display_name())
            .finish()
    }
}

/// A migration bound to the provider of the run executing it.
pub struct BoundMigration<'a> {
    migration: Arc<dyn Migration>,
    name: String,
    provider: &'a mut TransformationProvider,
}

impl BoundMigration<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&mut self) -> &mut TransformationProvider {
        &mut *self.provider
    }

    pub async fn apply(&mut self) -> Result<()> {
        self.migration.apply(self.provider).await
    }

    pub async fn revert(&mut self) -> Result<()> {
        self.migration.revert(self.provider).await
    }
}

/// Validated set of migrations for one series key.
///
/// Ignored descriptors are dropped on construction. Every remaining version
/// is unique.
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    key: String,
    migrations: BTreeMap<i64, MigrationDescriptor>,
    latest_version: i64,
}

impl MigrationCatalog {
    /// Build a catalog, failing with every duplicated version listed once.
    pub fn new(
        key: impl Into<String>,
        descriptors: impl IntoIterator<Item = MigrationDescriptor>,
    ) -> Result<Self> {
        let mut migrations = BTreeMap::new();
        let mut duplicates = Vec::new();

        for descriptor in descriptors.into_iter().filter(|d| !d.is_ignored()) {
            let version = descriptor.version;
            if migrations.insert(version, descriptor).is_some() && !duplicates.contains(&version) {
                duplicates.push(version);
            }
        }

        if !duplicates.is_empty() {
            duplicates.sort_unstable();
            return Err(MigrateError::DuplicatedVersion(duplicates));
        }

        let latest_version = migrations.keys().next_back().copied().unwrap_or(0);

        Ok(Self {
            key: key.into(),
            migrations,
            latest_version,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Highest registered version, or 0 when empty.
    pub fn latest_version(&self) -> i64 {
        self.latest_version
    }

    /// Registered versions, ascending.
    pub fn versions(&self) -> Vec<i64> {
        self.migrations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Descriptors in version order.
    pub fn iter(&self) -> impl Iterator<Item = &MigrationDescriptor> {
        self.migrations.values()
    }

    /// Descriptor for exactly `version`.
    pub fn get(&self, version: i64) -> Result<&MigrationDescriptor> {
        self.migrations
            .get(&version)
            .ok_or(MigrateError::NotFound(version))
    }

    /// `(version, display name)` pairs, for logging.
    pub fn summary(&self) -> Vec<(i64, String)> {
        self.iter()
            .map(|d| (d.version, d.display_name()))
            .collect()
    }

    /// Bind a descriptor's migration to `provider`.
    pub fn instantiate<'a>(
        &self,
        descriptor: &MigrationDescriptor,
        provider: &'a mut TransformationProvider,
    ) -> BoundMigration<'a> {
        BoundMigration {
            migration: Arc::clone(&descriptor.migration),
            name: descriptor.display_name(),
            provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AddUsersTable;

    #[async_trait]
    impl Migration for AddUsersTable {
        async fn apply(&self, _db: &mut TransformationProvider) -> Result<()> {
            Ok(())
        }
    }

    fn descriptor(version: i64) -> MigrationDescriptor {
        MigrationDescriptor::new(version, AddUsersTable)
    }

    #[test]
    fn test_catalog_latest_version() {
        let catalog = MigrationCatalog::new("", [descriptor(3), descriptor(1), descriptor(2)]).unwrap();
        assert_eq!(catalog.latest_version(), 3);
        assert_eq!(catalog.versions(), vec![1, 2, 3]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_empty_catalog_latest_version_is_zero() {
        let catalog = MigrationCatalog::new("key", Vec::new()).unwrap();
        assert_eq!(catalog.latest_version(), 0);
        assert!(catalog.is_empty());
        assert_eq!(catalog.key(), "key");
    }

    #[test]
    fn test_duplicates_listed_once() {
        let err = MigrationCatalog::new(
            "",
            [
                descriptor(5),
                descriptor(2),
                descriptor(5),
                descriptor(5),
                descriptor(2),
                descriptor(9),
            ],
        )
        .unwrap_err();
        match err {
            MigrateError::DuplicatedVersion(versions) => assert_eq!(versions, vec![2, 5]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ignored_descriptors_excluded() {
        let catalog = MigrationCatalog::new(
            "",
            [descriptor(1), descriptor(1).ignored(true), descriptor(7).ignored(true)],
        )
        .unwrap();
        assert_eq!(catalog.versions(), vec![1]);
        assert_eq!(catalog.latest_version(), 1);
    }

    #[test]
    fn test_lookup_missing_version() {
        let catalog = MigrationCatalog::new("", [descriptor(1)]).unwrap();
        assert!(catalog.get(1).is_ok());
        assert!(matches!(catalog.get(2), Err(MigrateError::NotFound(2))));
    }

    #[test]
    fn test_display_name_defaults_to_type_name() {
        assert_eq!(descriptor(1).display_name(), "Add users table");
        assert_eq!(descriptor(1).with_name("Custom").display_name(), "Custom");
    }
}
