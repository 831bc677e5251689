//! The transformation provider: schema and data operations on one connection.
//!
//! [`TransformationProvider`] combines a [`Dialect`] (what SQL to send) with a
//! [`Connection`] (where to send it). Migrations receive it as their only
//! handle on the database. It also owns transaction state and the ledger of
//! applied versions, see [`ledger`].

mod batch;
mod ledger;

pub use batch::split_batches;
pub use ledger::{DEFAULT_LEDGER_TABLE, KEY_COLUMN, VERSION_COLUMN};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::core::identifier::validate_identifier;
use crate::core::schema::{Column, ColumnType, DbType, DefaultValue, ForeignKeyAction, ObjectName};
use crate::core::traits::{Connection, Dialect};
use crate::core::value::{Row, RowValues};
use crate::drivers;
use crate::error::{MigrateError, Result};
use crate::observer::{MigrationObserver, TracingObserver};

/// Schema engine bound to one dialect and one connection.
pub struct TransformationProvider {
    dialect: Arc<dyn Dialect>,
    connection: Box<dyn Connection>,
    owns_connection: bool,
    observer: Arc<dyn MigrationObserver>,
    command_timeout: Option<Duration>,
    in_transaction: bool,
    ledger_table: ObjectName,
    ledger_ready: bool,
}

/// Await `fut`, failing with a SQL error if `timeout` expires first.
async fn with_timeout<T>(
    timeout: Option<Duration>,
    sql: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        None => fut.await,
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|elapsed| MigrateError::sql(sql, elapsed))?,
    }
}

impl TransformationProvider {
    /// Wrap an externally owned connection. [`close`](Self::close) leaves it open.
    pub fn new(dialect: Arc<dyn Dialect>, connection: Box<dyn Connection>) -> Self {
        Self {
            dialect,
            connection,
            owns_connection: false,
            observer: Arc::new(TracingObserver),
            command_timeout: None,
            in_transaction: false,
            ledger_table: ObjectName::new(DEFAULT_LEDGER_TABLE),
            ledger_ready: false,
        }
    }

    /// Open a connection from configuration. The provider owns it and closes
    /// it on [`close`](Self::close).
    pub async fn connect(config: &Config) -> Result<Self> {
        let dialect = config.database.kind()?.dialect();
        let connection = drivers::connect(&config.database).await?;
        let mut provider = Self::new(dialect, connection)
            .with_command_timeout(config.migrations.command_timeout())
            .with_ledger_table(&config.migrations.ledger_table)?;
        provider.owns_connection = true;
        Ok(provider)
    }

    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Per-statement timeout; `None` waits indefinitely.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Use a different ledger table name.
    pub fn with_ledger_table(mut self, name: &str) -> Result<Self> {
        validate_identifier(name)?;
        self.ledger_table = ObjectName::new(name);
        self.ledger_ready = false;
        Ok(self)
    }

    /// The dialect, for engine-specific branches inside migrations.
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn observer(&self) -> Arc<dyn MigrationObserver> {
        Arc::clone(&self.observer)
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn ledger_table(&self) -> &ObjectName {
        &self.ledger_table
    }

    /// Close the connection if this provider opened it.
    pub async fn close(&mut self) -> Result<()> {
        if self.owns_connection {
            debug!("Closing {} connection", self.dialect.name());
            self.connection.close().await?;
        }
        Ok(())
    }

    /// Give the connection back to its owner.
    pub fn into_connection(self) -> Box<dyn Connection> {
        self.connection
    }

    // ===== Execution =====

    async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        self.observer.executing_sql(sql);
        let timeout = self.command_timeout;
        let result = with_timeout(timeout, sql, self.connection.execute(sql)).await;
        if result.is_err() {
            warn!("query failed: {}", sql);
        }
        result
    }

    /// Execute a script, split into batches on the dialect's separator.
    /// Returns the affected-row count of the last batch.
    pub async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        let separator = self.dialect.batch_separator().map(str::to_string);
        let mut affected = 0;
        for batch in split_batches(sql, separator.as_deref()) {
            affected = self.execute_raw(&batch).await?;
        }
        Ok(affected)
    }

    /// Run a query and return every row as text.
    pub async fn execute_query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.observer.executing_sql(sql);
        let timeout = self.command_timeout;
        let result = with_timeout(timeout, sql, self.connection.query(sql)).await;
        if result.is_err() {
            warn!("query failed: {}", sql);
        }
        result
    }

    /// First cell of the first row, if any.
    pub async fn execute_scalar(&mut self, sql: &str) -> Result<Option<String>> {
        let rows = self.execute_query(sql).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.get_str(0).map(str::to_string)))
    }

    /// Run a `COUNT(*)` check; no row counts as zero.
    async fn exists(&mut self, sql: &str) -> Result<bool> {
        let rows = self.execute_query(sql).await?;
        match rows.first() {
            Some(row) => Ok(row.get_i64(0)?.unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    // ===== Transactions =====

    /// Open a transaction unless one is already open.
    pub async fn begin_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        let timeout = self.command_timeout;
        with_timeout(timeout, "BEGIN", self.connection.begin()).await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction, if any. On failure the transaction is
    /// still considered open so a rollback can follow.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        let timeout = self.command_timeout;
        with_timeout(timeout, "COMMIT", self.connection.commit()).await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction, if any.
    pub async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        let timeout = self.command_timeout;
        with_timeout(timeout, "ROLLBACK", self.connection.rollback()).await
    }

    // ===== Tables =====

    /// Create a table. Two or more primary-key columns produce a named
    /// `PK_<table>` constraint instead of inline keys.
    pub async fn add_table(&mut self, table: &ObjectName, columns: &[Column]) -> Result<()> {
        validate_identifier(&table.name)?;
        if columns.is_empty() {
            return Err(MigrateError::Argument(format!(
                "Table {} must have at least one column",
                table
            )));
        }

        let primary_keys: Vec<&str> = columns
            .iter()
            .filter(|c| c.is_primary_key())
            .map(|c| c.name.as_str())
            .collect();
        let compound_primary_key = primary_keys.len() > 1;

        let mut sections = columns
            .iter()
            .map(|c| self.dialect.column_sql(c, compound_primary_key))
            .collect::<Result<Vec<_>>>()?;
        if compound_primary_key {
            let pk_name = format!("PK_{}", table.name);
            sections.push(self.dialect.primary_key_clause_sql(&pk_name, &primary_keys));
        }

        let sql = self.dialect.add_table_sql(table, &sections.join(", "));
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn remove_table(&mut self, table: &ObjectName) -> Result<()> {
        let sql = self.dialect.remove_table_sql(table);
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn rename_table(&mut self, table: &ObjectName, new_name: &str) -> Result<()> {
        validate_identifier(new_name)?;
        let sql = self.dialect.rename_table_sql(table, new_name)?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn table_exists(&mut self, table: &ObjectName) -> Result<bool> {
        let sql = self.dialect.table_exists_sql(table)?;
        self.exists(&sql).await
    }

    /// Tables in `schema`, or in the current schema when `None`.
    pub async fn get_tables(&mut self, schema: Option<&str>) -> Result<Vec<ObjectName>> {
        let sql = self.dialect.list_tables_sql(schema)?;
        let rows = self.execute_query(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.get_str(0)
                    .map(|name| ObjectName::new(name).with_schema(row.get_str(1).unwrap_or("")))
            })
            .collect())
    }

    // ===== Columns =====

    pub async fn add_column(&mut self, table: &ObjectName, column: &Column) -> Result<()> {
        let column_sql = self.dialect.column_sql(column, false)?;
        let sql = self.dialect.add_column_sql(table, &column_sql);
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    /// Change a column's type and nullability.
    pub async fn change_column(
        &mut self,
        table: &ObjectName,
        column: &str,
        column_type: &ColumnType,
        not_null: bool,
    ) -> Result<()> {
        let type_sql = self.dialect.column_type_sql(column_type)?;

        let mut nullability = Some(not_null);
        if let Some(query) = self.dialect.nullability_query(table, column) {
            if let Some(current) = self.execute_scalar(&query).await? {
                let already_not_null = current.trim().eq_ignore_ascii_case("n");
                if already_not_null == not_null {
                    nullability = None;
                }
            }
        }

        let change = self
            .dialect
            .change_column_sql(table, column, &type_sql, nullability)?;
        self.execute_non_query(&change.type_change).await?;
        if let Some(sql) = change.nullability_change {
            self.execute_non_query(&sql).await?;
        }
        Ok(())
    }

    /// Set a column's default, or drop it with `None`.
    pub async fn change_default_value(
        &mut self,
        table: &ObjectName,
        column: &str,
        value: Option<&DefaultValue>,
    ) -> Result<()> {
        let sql = self.dialect.change_default_value_sql(table, column, value)?;

        if let Some(query) = self.dialect.default_constraint_query(table, column) {
            let rows = self.execute_query(&query).await?;
            for name in rows.iter().filter_map(|row| row.get_str(0)) {
                let drop_sql = self.dialect.remove_constraint_sql(table, name, None)?;
                self.execute_non_query(&drop_sql).await?;
            }
        }

        if let Some(sql) = sql {
            self.execute_non_query(&sql).await?;
        }
        Ok(())
    }

    pub async fn rename_column(&mut self, table: &ObjectName, old: &str, new: &str) -> Result<()> {
        validate_identifier(new)?;
        let sql = self.dialect.rename_column_sql(table, old, new)?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    /// Drop a column, after any constraints that would block it.
    pub async fn remove_column(&mut self, table: &ObjectName, column: &str) -> Result<()> {
        let sql = self.dialect.remove_column_sql(table, column)?;

        if let Some(query) = self.dialect.column_constraints_query(table, column) {
            let rows = self.execute_query(&query).await?;
            for name in rows.iter().filter_map(|row| row.get_str(0)) {
                self.remove_constraint(table, name).await?;
            }
        }

        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn column_exists(&mut self, table: &ObjectName, column: &str) -> Result<bool> {
        let sql = self.dialect.column_exists_sql(table, column)?;
        self.exists(&sql).await
    }

    // ===== Constraints =====

    #[allow(clippy::too_many_arguments)]
    pub async fn add_foreign_key(
        &mut self,
        name: &str,
        table: &ObjectName,
        columns: &[&str],
        ref_table: &ObjectName,
        ref_columns: &[&str],
        on_delete: ForeignKeyAction,
        on_update: ForeignKeyAction,
    ) -> Result<()> {
        validate_identifier(name)?;
        let sql = self.dialect.add_foreign_key_sql(
            name,
            table,
            columns,
            ref_table,
            ref_columns,
            on_delete,
            on_update,
        )?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn add_primary_key(
        &mut self,
        name: &str,
        table: &ObjectName,
        columns: &[&str],
    ) -> Result<()> {
        validate_identifier(name)?;
        let sql = self.dialect.add_primary_key_sql(name, table, columns)?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn add_unique_constraint(
        &mut self,
        name: &str,
        table: &ObjectName,
        columns: &[&str],
    ) -> Result<()> {
        validate_identifier(name)?;
        let sql = self.dialect.add_unique_constraint_sql(name, table, columns)?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn add_check_constraint(
        &mut self,
        name: &str,
        table: &ObjectName,
        check_sql: &str,
    ) -> Result<()> {
        validate_identifier(name)?;
        let sql = self.dialect.add_check_constraint_sql(name, table, check_sql)?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn remove_constraint(&mut self, table: &ObjectName, name: &str) -> Result<()> {
        let constraint_type = match self.dialect.constraint_type_query(table, name) {
            Some(query) => self.execute_scalar(&query).await?,
            None => None,
        };
        let sql = self
            .dialect
            .remove_constraint_sql(table, name, constraint_type.as_deref())?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn constraint_exists(&mut self, table: &ObjectName, name: &str) -> Result<bool> {
        let sql = self.dialect.constraint_exists_sql(table, name)?;
        self.exists(&sql).await
    }

    // ===== Indexes =====

    pub async fn add_index(
        &mut self,
        name: &str,
        unique: bool,
        table: &ObjectName,
        columns: &[&str],
    ) -> Result<()> {
        validate_identifier(name)?;
        let sql = self.dialect.add_index_sql(name, unique, table, columns)?;
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn remove_index(&mut self, name: &str, table: &ObjectName) -> Result<()> {
        let sql = self.dialect.remove_index_sql(name, table);
        self.execute_non_query(&sql).await?;
        Ok(())
    }

    pub async fn index_exists(&mut self, table: &ObjectName, name: &str) -> Result<bool> {
        let sql = self.dialect.index_exists_sql(table, name)?;
        self.exists(&sql).await
    }

    // ===== Data =====

    pub async fn insert(&mut self, table: &ObjectName, values: &RowValues) -> Result<u64> {
        if values.is_empty() {
            return Err(MigrateError::Argument(format!(
                "Insert into {} needs at least one column",
                table
            )));
        }
        let sql = self.dialect.insert_sql(table, values);
        self.execute_non_query(&sql).await
    }

    pub async fn update(
        &mut self,
        table: &ObjectName,
        values: &RowValues,
        where_sql: Option<&str>,
    ) -> Result<u64> {
        if values.is_empty() {
            return Err(MigrateError::Argument(format!(
                "Update of {} needs at least one column",
                table
            )));
        }
        let sql = self.dialect.update_sql(table, values, where_sql);
        self.execute_non_query(&sql).await
    }

    pub async fn delete(&mut self, table: &ObjectName, where_sql: Option<&str>) -> Result<u64> {
        let sql = self.dialect.delete_sql(table, where_sql);
        self.execute_non_query(&sql).await
    }

    /// Whether the dialect maps `db_type` to anything.
    pub fn type_is_supported(&self, db_type: DbType) -> bool {
        self.dialect.type_map().has_type(db_type)
    }
}
