//! The applied-version ledger.
//!
//! One row per applied `(version, key)` pair. The table is created on first
//! access, so a fresh database needs no setup step.

use crate::core::identifier::quote_literal;
use crate::core::schema::{Column, ColumnProperty, ColumnType, DbType, DefaultValue};
use crate::core::value::RowValues;
use crate::error::Result;

use super::TransformationProvider;

/// Table name used unless configured otherwise.
pub const DEFAULT_LEDGER_TABLE: &str = "SchemaInfo";
pub const VERSION_COLUMN: &str = "Version";
pub const KEY_COLUMN: &str = "AssemblyKey";

const KEY_LENGTH: u32 = 200;

impl TransformationProvider {
    /// Create the ledger table if it does not exist yet.
    pub async fn ensure_ledger(&mut self) -> Result<()> {
        if self.ledger_ready {
            return Ok(());
        }

        let table = self.ledger_table.clone();
        if !self.table_exists(&table).await? {
            self.add_table(
                &table,
                &[
                    Column::new(VERSION_COLUMN, ColumnType::new(DbType::Int64))
                        .with_property(ColumnProperty::PRIMARY_KEY),
                    Column::new(
                        KEY_COLUMN,
                        ColumnType::new(DbType::String).with_length(KEY_LENGTH),
                    )
                    .with_property(ColumnProperty::PRIMARY_KEY)
                    .with_default(DefaultValue::Text(String::new())),
                ],
            )
            .await?;
        }

        // A table created inside a transaction disappears on rollback.
        if !self.in_transaction {
            self.ledger_ready = true;
        }
        Ok(())
    }

    /// Versions recorded for `key`, ascending.
    pub async fn get_applied_migrations(&mut self, key: &str) -> Result<Vec<i64>> {
        self.ensure_ledger().await?;

        let f = self.dialect.formatter();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            f.name(VERSION_COLUMN),
            f.table(&self.ledger_table),
            f.name(KEY_COLUMN),
            quote_literal(key)
        );

        let rows = self.execute_query(&sql).await?;
        let mut versions = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(version) = row.get_i64(0)? {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Record `version` as applied for `key`.
    pub async fn migration_applied(&mut self, version: i64, key: &str) -> Result<()> {
        self.ensure_ledger().await?;
        let table = self.ledger_table.clone();
        let values = RowValues::new()
            .with(VERSION_COLUMN, version)
            .with(KEY_COLUMN, key);
        self.insert(&table, &values).await?;
        Ok(())
    }

    /// Remove the record of `version` for `key`.
    pub async fn migration_unapplied(&mut self, version: i64, key: &str) -> Result<()> {
        self.ensure_ledger().await?;
        let table = self.ledger_table.clone();
        let f = self.dialect.formatter();
        let where_sql = format!(
            "{} = {} AND {} = {}",
            f.name(VERSION_COLUMN),
            version,
            f.name(KEY_COLUMN),
            quote_literal(key)
        );
        self.delete(&table, Some(&where_sql)).await?;
        Ok(())
    }
}
