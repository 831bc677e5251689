//! Migrations written as plain SQL scripts.
//!
//! A directory holds `<version>_<name>.up.sql` files and, optionally, matching
//! `<version>_<name>.down.sql` files. Leading comment lines may carry flags:
//!
//! ```sql
//! -- schemaver: no-transaction
//! CREATE INDEX CONCURRENTLY ix_users_email ON users (email);
//! ```
//!
//! `no-transaction` runs the script outside a transaction and `ignore` leaves
//! it out of the catalog.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::core::traits::Migration;
use crate::error::{MigrateError, Result};
use crate::provider::TransformationProvider;

use super::catalog::MigrationDescriptor;
use super::to_human_name;

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";
const FLAG_PREFIX: &str = "-- schemaver:";

/// A migration backed by an up script and an optional down script.
#[derive(Debug, Clone)]
pub struct SqlScriptMigration {
    name: String,
    up: String,
    down: Option<String>,
}

impl SqlScriptMigration {
    pub fn new(name: impl Into<String>, up: impl Into<String>, down: Option<String>) -> Self {
        Self {
            name: name.into(),
            up: up.into(),
            down,
        }
    }
}

#[async_trait]
impl Migration for SqlScriptMigration {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn apply(&self, db: &mut TransformationProvider) -> Result<()> {
        db.execute_non_query(&self.up).await?;
        Ok(())
    }

    async fn revert(&self, db: &mut TransformationProvider) -> Result<()> {
        if let Some(down) = &self.down {
            db.execute_non_query(down).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ScriptFlags {
    no_transaction: bool,
    ignore: bool,
}

/// Read flags from the comment lines at the top of a script.
fn parse_flags(script: &str) -> ScriptFlags {
    let mut flags = ScriptFlags::default();
    for line in script.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with("--") {
            break;
        }
        let Some(prefix) = line.get(..FLAG_PREFIX.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(FLAG_PREFIX) {
            continue;
        }
        let flag = line[FLAG_PREFIX.len()..].trim();
        if flag.eq_ignore_ascii_case("no-transaction") {
            flags.no_transaction = true;
        } else if flag.eq_ignore_ascii_case("ignore") {
            flags.ignore = true;
        }
    }
    flags
}

/// Split `<version>_<name>` into its parts.
fn parse_stem(stem: &str, path: &Path) -> Result<(i64, String)> {
    let (version, name) = stem.split_once('_').ok_or_else(|| {
        MigrateError::Argument(format!(
            "Script {} must be named <version>_<name>",
            path.display()
        ))
    })?;
    let version = version.parse::<i64>().map_err(|_| {
        MigrateError::Argument(format!(
            "Script {} has an invalid version: {:?}",
            path.display(),
            version
        ))
    })?;
    Ok((version, name.to_string()))
}

/// Load every script migration in `dir`, sorted by version.
///
/// Files without an `.up.sql` or `.down.sql` suffix are skipped. Duplicate
/// versions are reported by [`MigrationCatalog::new`].
///
/// [`MigrationCatalog::new`]: super::MigrationCatalog::new
pub fn load_directory(dir: &Path) -> Result<Vec<MigrationDescriptor>> {
    let mut ups: Vec<(i64, String, PathBuf)> = Vec::new();
    let mut downs: HashMap<(i64, String), PathBuf> = HashMap::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some(stem) = file_name.strip_suffix(UP_SUFFIX) {
            let (version, name) = parse_stem(stem, &path)?;
            ups.push((version, name, path.clone()));
        } else if let Some(stem) = file_name.strip_suffix(DOWN_SUFFIX) {
            let (version, name) = parse_stem(stem, &path)?;
            downs.insert((version, name), path.clone());
        }
    }

    for ((version, name), path) in &downs {
        if !ups.iter().any(|(v, n, _)| v == version && n == name) {
            return Err(MigrateError::Argument(format!(
                "Down script {} has no matching up script",
                path.display()
            )));
        }
    }

    ups.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut descriptors = Vec::with_capacity(ups.len());
    for (version, name, path) in ups {
        let up = fs::read_to_string(&path)?;
        let down = match downs.remove(&(version, name.clone())) {
            Some(down_path) => Some(fs::read_to_string(down_path)?),
            None => None,
        };
        let flags = parse_flags(&up);
        debug!("Loaded script migration {} from {}", version, path.display());

        let migration = SqlScriptMigration::new(to_human_name(&name), up, down);
        descriptors.push(
            MigrationDescriptor::new(version, migration)
                .without_transaction(flags.no_transaction)
                .ignored(flags.ignore),
        );
    }

    Ok(descriptors)
}
