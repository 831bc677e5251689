//! Core traits for the migration engine.
//!
//! - [`Connection`]: executes SQL text against one database session
//! - [`Dialect`]: per-engine SQL generation (the dialect-adapter contract)
//! - [`Migration`]: a versioned, reversible change
//!
//! Dialects only produce SQL. Anything that needs a round-trip, such as
//! existence checks or looking up a constraint name before dropping it, is
//! orchestrated by [`TransformationProvider`] using the queries the dialect
//! hands back.
//!
//! [`TransformationProvider`]: crate::provider::TransformationProvider

use async_trait::async_trait;

use crate::dialect::{ColumnSqlBuilder, ForeignKeyActionMap, PropertyMap, SqlFormatter};
use crate::error::{MigrateError, Result};
use crate::migration::to_human_name;
use crate::provider::TransformationProvider;
use crate::typemap::TypeMap;

use super::identifier::QuoteStyle;
use super::schema::{Column, ColumnType, DefaultValue, ForeignKeyAction, ObjectName};
use super::value::{quote_value, Row, RowValues};

/// One database session.
///
/// Implementations own a single native connection. Statements are issued
/// strictly one at a time; the provider never interleaves calls.
#[async_trait]
pub trait Connection: Send {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Run a query and collect every row as text.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>>;

    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Close the native connection. Further calls fail.
    async fn close(&mut self) -> Result<()>;
}

/// Outcome of a column type change: the type statement plus an optional
/// separate nullability statement, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub type_change: String,
    pub nullability_change: Option<String>,
}

/// SQL generation strategy for one database engine.
///
/// Default methods produce ANSI-flavoured statements; adapters override what
/// their engine spells differently and return [`MigrateError::Unsupported`]
/// for what it cannot do at all.
pub trait Dialect: Send + Sync {
    /// Dialect name (e.g., "postgres", "mssql").
    fn name(&self) -> &str;

    fn quote_style(&self) -> QuoteStyle;

    fn type_map(&self) -> &TypeMap;

    fn property_map(&self) -> &PropertyMap;

    fn fk_action_map(&self) -> &ForeignKeyActionMap;

    /// Whether identity columns keep their type token.
    fn identity_needs_type(&self) -> bool {
        true
    }

    /// Whether a primary-key identity column still emits NOT NULL.
    fn needs_not_null_for_identity(&self) -> bool {
        true
    }

    /// Line that separates batches in a script, if any.
    fn batch_separator(&self) -> Option<&str> {
        None
    }

    /// Statement that opens a transaction in a generated script. `None` when
    /// the engine starts one implicitly.
    fn begin_transaction_sql(&self) -> Option<&str> {
        Some("BEGIN")
    }

    fn formatter(&self) -> SqlFormatter {
        SqlFormatter::new(self.quote_style())
    }

    // ===== Columns and tables =====

    /// SQL type for a column type.
    fn column_type_sql(&self, column_type: &ColumnType) -> Result<String> {
        self.type_map().get(column_type)
    }

    fn default_value_sql(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Text(text) => quote_value(Some(text)),
            DefaultValue::Raw(expr) => expr.clone(),
        }
    }

    /// Full column clause as used in CREATE TABLE and ADD COLUMN.
    fn column_sql(&self, column: &Column, compound_primary_key: bool) -> Result<String> {
        ColumnSqlBuilder::new(self, column, compound_primary_key)?.build()
    }

    fn add_table_sql(&self, table: &ObjectName, columns_sql: &str) -> String {
        format!("CREATE TABLE {} ({})", self.formatter().table(table), columns_sql)
    }

    fn primary_key_clause_sql(&self, name: &str, columns: &[&str]) -> String {
        let f = self.formatter();
        format!("CONSTRAINT {} PRIMARY KEY ({})", f.name(name), f.cols(columns))
    }

    fn remove_table_sql(&self, table: &ObjectName) -> String {
        format!("DROP TABLE {}", self.formatter().table(table))
    }

    fn rename_table_sql(&self, table: &ObjectName, new_name: &str) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} RENAME TO {}",
            f.table(table),
            f.name(new_name)
        ))
    }

    fn add_column_sql(&self, table: &ObjectName, column_sql: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.formatter().table(table),
            column_sql
        )
    }

    /// Type change for an existing column. `not_null` is `None` when the
    /// nullability must be left alone.
    fn change_column_sql(
        &self,
        table: &ObjectName,
        column: &str,
        type_sql: &str,
        not_null: Option<bool>,
    ) -> Result<ColumnChange> {
        let f = self.formatter();
        let mut sql = format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            f.table(table),
            f.name(column),
            type_sql
        );
        match not_null {
            Some(true) => sql.push_str(" NOT NULL"),
            Some(false) => sql.push_str(" NULL"),
            None => {}
        }
        Ok(ColumnChange {
            type_change: sql,
            nullability_change: None,
        })
    }

    /// Set or drop a column default. `Ok(None)` means nothing to execute.
    fn change_default_value_sql(
        &self,
        table: &ObjectName,
        column: &str,
        value: Option<&DefaultValue>,
    ) -> Result<Option<String>> {
        let f = self.formatter();
        let action = match value {
            Some(v) => format!("SET DEFAULT {}", self.default_value_sql(v)),
            None => "DROP DEFAULT".to_string(),
        };
        Ok(Some(format!(
            "ALTER TABLE {} ALTER COLUMN {} {}",
            f.table(table),
            f.name(column),
            action
        )))
    }

    fn rename_column_sql(&self, table: &ObjectName, old: &str, new: &str) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            f.table(table),
            f.name(old),
            f.name(new)
        ))
    }

    fn remove_column_sql(&self, table: &ObjectName, column: &str) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            f.table(table),
            f.name(column)
        ))
    }

    // ===== Constraints and indexes =====

    #[allow(clippy::too_many_arguments)]
    fn add_foreign_key_sql(
        &self,
        name: &str,
        table: &ObjectName,
        columns: &[&str],
        ref_table: &ObjectName,
        ref_columns: &[&str],
        on_delete: ForeignKeyAction,
        on_update: ForeignKeyAction,
    ) -> Result<String> {
        let f = self.formatter();
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            f.table(table),
            f.name(name),
            f.cols(columns),
            f.table(ref_table),
            f.cols(ref_columns)
        );
        for clause in [
            self.fk_action_map().on_update(on_update),
            self.fk_action_map().on_delete(on_delete),
        ] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(&clause);
            }
        }
        Ok(sql)
    }

    fn add_primary_key_sql(&self, name: &str, table: &ObjectName, columns: &[&str]) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            f.table(table),
            f.name(name),
            f.cols(columns)
        ))
    }

    fn add_unique_constraint_sql(
        &self,
        name: &str,
        table: &ObjectName,
        columns: &[&str],
    ) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            f.table(table),
            f.name(name),
            f.cols(columns)
        ))
    }

    fn add_check_constraint_sql(
        &self,
        name: &str,
        table: &ObjectName,
        check_sql: &str,
    ) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
            f.table(table),
            f.name(name),
            check_sql
        ))
    }

    /// Drop a constraint. `constraint_type` is the answer to
    /// [`constraint_type_query`](Dialect::constraint_type_query), when asked.
    fn remove_constraint_sql(
        &self,
        table: &ObjectName,
        name: &str,
        constraint_type: Option<&str>,
    ) -> Result<String> {
        let _ = constraint_type;
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            f.table(table),
            f.name(name)
        ))
    }

    fn add_index_sql(
        &self,
        name: &str,
        unique: bool,
        table: &ObjectName,
        columns: &[&str],
    ) -> Result<String> {
        if columns.is_empty() {
            return Err(MigrateError::Argument(format!(
                "Index {} must have at least one column",
                name
            )));
        }
        let f = self.formatter();
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            f.name(name),
            f.table(table),
            f.cols(columns)
        ))
    }

    fn remove_index_sql(&self, name: &str, table: &ObjectName) -> String {
        let f = self.formatter();
        format!("DROP INDEX {} ON {}", f.name(name), f.table(table))
    }

    // ===== Lookups run by the provider before a statement =====

    /// Query yielding the type of constraint `name`, for dialects whose drop
    /// syntax depends on it.
    fn constraint_type_query(&self, table: &ObjectName, name: &str) -> Option<String> {
        let _ = (table, name);
        None
    }

    /// Query yielding names of constraints that must be dropped before the
    /// column itself can be removed.
    fn column_constraints_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        let _ = (table, column);
        None
    }

    /// Query yielding the name of the column's current default constraint.
    fn default_constraint_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        let _ = (table, column);
        None
    }

    /// Query yielding the column's current nullability as `Y`/`N`.
    fn nullability_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        let _ = (table, column);
        None
    }

    // ===== Existence checks (single COUNT(*) cell) =====

    fn table_exists_sql(&self, table: &ObjectName) -> Result<String>;

    fn column_exists_sql(&self, table: &ObjectName, column: &str) -> Result<String>;

    fn index_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String>;

    fn constraint_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String>;

    /// Query listing `(name, schema)` of tables in `schema`, or the current
    /// schema when `None`.
    fn list_tables_sql(&self, schema: Option<&str>) -> Result<String>;

    // ===== Data =====

    fn insert_sql(&self, table: &ObjectName, values: &RowValues) -> String {
        let f = self.formatter();
        let literals: Vec<String> = values.values().into_iter().map(quote_value).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            f.table(table),
            f.cols(&values.columns()),
            literals.join(", ")
        )
    }

    fn update_sql(&self, table: &ObjectName, values: &RowValues, where_sql: Option<&str>) -> String {
        let f = self.formatter();
        let assignments: Vec<String> = values
            .iter()
            .map(|(column, value)| format!("{}={}", f.name(column), quote_value(value)))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", f.table(table), assignments.join(","));
        if let Some(clause) = where_sql.filter(|w| !w.trim().is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql
    }

    fn delete_sql(&self, table: &ObjectName, where_sql: Option<&str>) -> String {
        let mut sql = format!("DELETE FROM {}", self.formatter().table(table));
        if let Some(clause) = where_sql.filter(|w| !w.trim().is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql
    }
}

/// A versioned, reversible schema or data change.
///
/// Migrations hold no connection of their own; every call receives the
/// provider of the run that executes them.
///
/// # Example
///
/// ```ignore
/// struct CreateUsersTable;
///
/// #[async_trait]
/// impl Migration for CreateUsersTable {
///     async fn apply(&self, db: &mut TransformationProvider) -> Result<()> {
///         db.add_table(&ObjectName::new("users"), &[
///             Column::new("id", ColumnType::new(DbType::Int64))
///                 .with_property(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY),
///         ]).await
///     }
///
///     async fn revert(&self, db: &mut TransformationProvider) -> Result<()> {
///         db.remove_table(&ObjectName::new("users")).await
///     }
/// }
/// ```
#[async_trait]
pub trait Migration: Send + Sync {
    /// Human-readable name; defaults to the type name split into words.
    fn name(&self) -> String {
        let full = std::any::type_name::<Self>();
        let short = full.rsplit("::").next().unwrap_or(full);
        to_human_name(short)
    }

    async fn apply(&self, db: &mut TransformationProvider) -> Result<()>;

    async fn revert(&self, db: &mut TransformationProvider) -> Result<()> {
        let _ = db;
        Ok(())
    }
}
