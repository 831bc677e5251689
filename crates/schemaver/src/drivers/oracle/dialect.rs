//! Oracle SQL dialect (Strategy pattern).
//!
//! Columns render default before nullability, `ADD (...)` wraps new columns,
//! index names carry the table's schema and scripts split on `/` lines.
//! Nullability changes are only emitted when the catalog disagrees, see
//! [`nullability_query`](Dialect::nullability_query).

use crate::core::identifier::{quote_literal, QuoteStyle};
use crate::core::schema::{Column, ColumnProperty, DbType, DefaultValue, ForeignKeyAction, ObjectName};
use crate::core::traits::{ColumnChange, Dialect};
use crate::dialect::{ColumnSqlBuilder, ForeignKeyActionMap, PropertyMap};
use crate::error::{MigrateError, Result};
use crate::typemap::TypeMap;

/// Oracle dialect implementation.
#[derive(Debug, Clone)]
pub struct OracleDialect {
    type_map: TypeMap,
    property_map: PropertyMap,
    fk_actions: ForeignKeyActionMap,
}

impl OracleDialect {
    pub fn new() -> Self {
        let mut type_map = TypeMap::new();
        type_map
            .put_default(DbType::AnsiStringFixedLength, "CHAR(255)")
            .put(DbType::AnsiStringFixedLength, 2000, "CHAR($l)")
            .put_default(DbType::AnsiString, "VARCHAR2(255)")
            .put(DbType::AnsiString, 2000, "VARCHAR2($l)")
            .put(DbType::AnsiString, TypeMap::MAX_CAPACITY, "CLOB")
            .put_default(DbType::Binary, "RAW(2000)")
            .put(DbType::Binary, 2000, "RAW($l)")
            .put(DbType::Binary, TypeMap::MAX_CAPACITY, "BLOB")
            .put_default(DbType::Boolean, "NUMBER(1,0)")
            .put_default(DbType::Byte, "NUMBER(3,0)")
            .put_default(DbType::Currency, "NUMBER(19,1)")
            .put_default(DbType::Date, "DATE")
            .put_default(DbType::DateTime, "TIMESTAMP(4)")
            .put_default(DbType::Decimal, "NUMBER")
            .put_with_scale(DbType::Decimal, 38, "NUMBER($l, $s)", 2)
            .put_default(DbType::Double, "BINARY_DOUBLE")
            .put_default(DbType::Guid, "RAW(16)")
            .put_default(DbType::Int16, "NUMBER(5,0)")
            .put_default(DbType::Int32, "NUMBER(10,0)")
            .put_default(DbType::Int64, "NUMBER(18,0)")
            .put_default(DbType::Single, "FLOAT(24)")
            .put_default(DbType::StringFixedLength, "NCHAR(255)")
            .put(DbType::StringFixedLength, 2000, "NCHAR($l)")
            .put_default(DbType::String, "NVARCHAR2(255)")
            .put(DbType::String, 2000, "NVARCHAR2($l)")
            .put(DbType::String, 1_073_741_823, "NCLOB")
            .put_default(DbType::Time, "DATE");

        let mut property_map = PropertyMap::standard();
        property_map.register(ColumnProperty::NULL, "");

        let mut fk_actions = ForeignKeyActionMap::standard();
        fk_actions.register(ForeignKeyAction::NoAction, "");

        Self {
            type_map,
            property_map,
            fk_actions,
        }
    }

    /// Owner filter: the current user, or the table's schema.
    fn owner_expr(schema: Option<&str>) -> String {
        schema
            .map(quote_literal)
            .unwrap_or_else(|| "user".to_string())
    }

    /// `USER_*` view for the connected schema, `ALL_*` otherwise.
    fn catalog_view(table: &ObjectName, suffix: &str) -> String {
        match table.schema() {
            Some(_) => format!("ALL_{}", suffix),
            None => format!("USER_{}", suffix),
        }
    }

    fn owner_filter(table: &ObjectName, column: &str) -> String {
        table
            .schema()
            .map(|s| format!(" AND {} = {}", column, quote_literal(s)))
            .unwrap_or_default()
    }
}

impl Default for OracleDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
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

    fn batch_separator(&self) -> Option<&str> {
        Some("/")
    }

    fn begin_transaction_sql(&self) -> Option<&str> {
        None
    }

    fn default_value_sql(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Text(text) => quote_literal(text),
            DefaultValue::Raw(expr) => expr.clone(),
        }
    }

    fn column_sql(&self, column: &Column, compound_primary_key: bool) -> Result<String> {
        Ok(ColumnSqlBuilder::new(self, column, compound_primary_key)?
            .append_name()
            .append_type()?
            .append_default()
            .append_not_null()
            .append_primary_key()
            .append_unique()
            .finish())
    }

    fn add_column_sql(&self, table: &ObjectName, column_sql: &str) -> String {
        format!("ALTER TABLE {} ADD ({})", self.formatter().table(table), column_sql)
    }

    fn change_column_sql(
        &self,
        table: &ObjectName,
        column: &str,
        type_sql: &str,
        not_null: Option<bool>,
    ) -> Result<ColumnChange> {
        let f = self.formatter();
        let mut sql = format!(
            "ALTER TABLE {} MODIFY {} {}",
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

    fn change_default_value_sql(
        &self,
        table: &ObjectName,
        column: &str,
        value: Option<&DefaultValue>,
    ) -> Result<Option<String>> {
        let f = self.formatter();
        let default_sql = value
            .map(|v| self.default_value_sql(v))
            .unwrap_or_else(|| "NULL".to_string());
        Ok(Some(format!(
            "ALTER TABLE {} MODIFY {} DEFAULT {}",
            f.table(table),
            f.name(column),
            default_sql
        )))
    }

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
        if on_update != ForeignKeyAction::NoAction {
            return Err(MigrateError::unsupported(
                self.name(),
                "actions when updating a foreign key",
            ));
        }
        if on_delete == ForeignKeyAction::SetDefault {
            return Err(MigrateError::unsupported(
                self.name(),
                "SET DEFAULT when deleting a referenced row",
            ));
        }
        let f = self.formatter();
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            f.table(table),
            f.name(name),
            f.cols(columns),
            f.table(ref_table),
            f.cols(ref_columns)
        );
        let clause = self.fk_actions.on_delete(on_delete);
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(sql)
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
            f.table(&table.sibling(name)),
            f.table(table),
            f.cols(columns)
        ))
    }

    fn remove_index_sql(&self, name: &str, table: &ObjectName) -> String {
        format!("DROP INDEX {}", self.formatter().table(&table.sibling(name)))
    }

    fn nullability_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        Some(format!(
            "SELECT NULLABLE FROM {} WHERE TABLE_NAME = {} AND COLUMN_NAME = {}{}",
            Self::catalog_view(table, "TAB_COLUMNS"),
            quote_literal(&table.name),
            quote_literal(column),
            Self::owner_filter(table, "OWNER")
        ))
    }

    fn table_exists_sql(&self, table: &ObjectName) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM ALL_TABLES WHERE TABLE_NAME = {} AND OWNER = {}",
            quote_literal(&table.name),
            Self::owner_expr(table.schema())
        ))
    }

    fn column_exists_sql(&self, table: &ObjectName, column: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM {} WHERE TABLE_NAME = {} AND COLUMN_NAME = {}{}",
            Self::catalog_view(table, "TAB_COLUMNS"),
            quote_literal(&table.name),
            quote_literal(column),
            Self::owner_filter(table, "OWNER")
        ))
    }

    fn index_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        let mut sql = format!(
            "SELECT COUNT(*) FROM {} WHERE TABLE_NAME = {} AND INDEX_NAME = {}",
            Self::catalog_view(table, "INDEXES"),
            quote_literal(&table.name),
            quote_literal(name)
        );
        sql.push_str(&Self::owner_filter(table, "TABLE_OWNER"));
        sql.push_str(&Self::owner_filter(table, "OWNER"));
        Ok(sql)
    }

    fn constraint_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM {} WHERE CONSTRAINT_NAME = {} AND TABLE_NAME = {}{}",
            Self::catalog_view(table, "CONSTRAINTS"),
            quote_literal(name),
            quote_literal(&table.name),
            Self::owner_filter(table, "OWNER")
        ))
    }

    fn list_tables_sql(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT TABLE_NAME, OWNER FROM ALL_TABLES WHERE OWNER = {}",
            Self::owner_expr(schema.filter(|s| !s.trim().is_empty()))
        ))
    }
}
