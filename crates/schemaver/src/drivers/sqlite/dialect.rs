//! SQLite SQL dialect (Strategy pattern).
//!
//! SQLite cannot alter existing columns or constraints, so most `ALTER`
//! operations are refused with [`MigrateError::Unsupported`]. Identifiers
//! are bracket-quoted and scripts split on `;`.

use crate::core::identifier::{quote_literal, QuoteStyle};
use crate::core::schema::{ColumnProperty, DbType, DefaultValue, ForeignKeyAction, ObjectName};
use crate::core::traits::{ColumnChange, Dialect};
use crate::dialect::{ForeignKeyActionMap, PropertyMap};
use crate::error::{MigrateError, Result};
use crate::typemap::TypeMap;

/// SQLite dialect implementation.
#[derive(Debug, Clone)]
pub struct SqliteDialect {
    type_map: TypeMap,
    property_map: PropertyMap,
    fk_actions: ForeignKeyActionMap,
}

impl SqliteDialect {
    pub fn new() -> Self {
        let mut type_map = TypeMap::new();
        for integer in [
            DbType::Byte,
            DbType::Int16,
            DbType::Int32,
            DbType::Int64,
            DbType::SByte,
            DbType::UInt16,
            DbType::UInt32,
            DbType::UInt64,
            DbType::Boolean,
        ] {
            type_map.put_default(integer, "INTEGER");
        }
        for numeric in [
            DbType::Currency,
            DbType::Decimal,
            DbType::Double,
            DbType::Single,
            DbType::VarNumeric,
        ] {
            type_map.put_default(numeric, "NUMERIC");
        }
        for text in [
            DbType::String,
            DbType::AnsiString,
            DbType::AnsiStringFixedLength,
            DbType::StringFixedLength,
        ] {
            type_map.put_default(text, "TEXT");
        }
        type_map
            .put_default(DbType::Binary, "BLOB")
            .put_default(DbType::DateTime, "DATETIME")
            .put_default(DbType::Time, "DATETIME")
            .put_default(DbType::Guid, "UNIQUEIDENTIFIER");

        let mut property_map = PropertyMap::standard();
        property_map.register(ColumnProperty::IDENTITY, "AUTOINCREMENT");

        Self {
            type_map,
            property_map,
            fk_actions: ForeignKeyActionMap::standard(),
        }
    }

    fn refuse<T>(&self, operation: &str) -> Result<T> {
        Err(MigrateError::unsupported(self.name(), operation))
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Bracket
    }

    fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    fn fk_action_map(&self) -> &ForeignKeyActionMap {
        &self.fk_actions
    }

    fn needs_not_null_for_identity(&self) -> bool {
        false
    }

    fn batch_separator(&self) -> Option<&str> {
        Some(";")
    }

    fn default_value_sql(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Text(text) => quote_literal(text),
            DefaultValue::Raw(expr) => expr.clone(),
        }
    }

    fn change_column_sql(
        &self,
        _table: &ObjectName,
        _column: &str,
        _type_sql: &str,
        _not_null: Option<bool>,
    ) -> Result<ColumnChange> {
        self.refuse("changing existing columns")
    }

    fn change_default_value_sql(
        &self,
        _table: &ObjectName,
        _column: &str,
        _value: Option<&DefaultValue>,
    ) -> Result<Option<String>> {
        self.refuse("changing column defaults")
    }

    fn rename_column_sql(&self, _table: &ObjectName, _old: &str, _new: &str) -> Result<String> {
        self.refuse("column rename")
    }

    fn remove_column_sql(&self, _table: &ObjectName, _column: &str) -> Result<String> {
        self.refuse("column removal")
    }

    fn add_foreign_key_sql(
        &self,
        _name: &str,
        _table: &ObjectName,
        _columns: &[&str],
        _ref_table: &ObjectName,
        _ref_columns: &[&str],
        _on_delete: ForeignKeyAction,
        _on_update: ForeignKeyAction,
    ) -> Result<String> {
        self.refuse("foreign keys")
    }

    fn add_primary_key_sql(&self, _name: &str, _table: &ObjectName, _columns: &[&str]) -> Result<String> {
        self.refuse("adding a primary key to an existing table")
    }

    fn add_unique_constraint_sql(
        &self,
        _name: &str,
        _table: &ObjectName,
        _columns: &[&str],
    ) -> Result<String> {
        self.refuse("adding a unique constraint to an existing table")
    }

    fn add_check_constraint_sql(
        &self,
        _name: &str,
        _table: &ObjectName,
        _check_sql: &str,
    ) -> Result<String> {
        self.refuse("adding a check constraint to an existing table")
    }

    fn remove_index_sql(&self, name: &str, _table: &ObjectName) -> String {
        format!("DROP INDEX {}", self.formatter().name(name))
    }

    fn table_exists_sql(&self, table: &ObjectName) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM [sqlite_master] WHERE [type] = 'table' AND [name] = {}",
            quote_literal(&table.name)
        ))
    }

    fn column_exists_sql(&self, table: &ObjectName, column: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM pragma_table_info({}) WHERE [name] = {}",
            quote_literal(&table.name),
            quote_literal(column)
        ))
    }

    fn index_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM [sqlite_master] WHERE [type] = 'index' AND [name] = {} AND [tbl_name] = {}",
            quote_literal(name),
            quote_literal(&table.name)
        ))
    }

    fn constraint_exists_sql(&self, _table: &ObjectName, _name: &str) -> Result<String> {
        self.refuse("constraint lookup")
    }

    fn list_tables_sql(&self, schema: Option<&str>) -> Result<String> {
        if schema.is_some_and(|s| !s.trim().is_empty()) {
            return self.refuse("schemas");
        }
        Ok("SELECT [name], NULL FROM [sqlite_master] WHERE [type] = 'table' \
            AND [name] <> 'sqlite_sequence' ORDER BY [name]"
            .to_string())
    }
}
