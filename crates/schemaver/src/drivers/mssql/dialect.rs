//! MSSQL SQL dialect (Strategy pattern).
//!
//! Bracket-quoted identifiers, `GO` batch separators, `sp_rename` and named
//! default constraints.

use uuid::Uuid;

use crate::core::identifier::{quote_literal, QuoteStyle};
use crate::core::schema::{ColumnProperty, DbType, DefaultValue, ObjectName};
use crate::core::traits::Dialect;
use crate::dialect::{ForeignKeyActionMap, PropertyMap};
use crate::error::Result;
use crate::typemap::TypeMap;

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    type_map: TypeMap,
    property_map: PropertyMap,
    fk_actions: ForeignKeyActionMap,
}

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        let mut type_map = TypeMap::new();
        type_map
            .put_default(DbType::AnsiStringFixedLength, "CHAR(255)")
            .put(DbType::AnsiStringFixedLength, 8000, "CHAR($l)")
            .put_default(DbType::AnsiString, "VARCHAR(255)")
            .put(DbType::AnsiString, 8000, "VARCHAR($l)")
            .put(DbType::AnsiString, TypeMap::MAX_CAPACITY, "VARCHAR(MAX)")
            .put_default(DbType::Binary, "VARBINARY(8000)")
            .put(DbType::Binary, 8000, "VARBINARY($l)")
            .put(DbType::Binary, TypeMap::MAX_CAPACITY, "VARBINARY(MAX)")
            .put_default(DbType::Boolean, "BIT")
            .put_default(DbType::Byte, "TINYINT")
            .put_default(DbType::Currency, "MONEY")
            .put_default(DbType::Date, "DATE")
            .put_default(DbType::DateTime, "DATETIME")
            .put_default(DbType::DateTime2, "DATETIME2")
            .put(DbType::DateTime2, 6, "DATETIME2($l)")
            .put_default(DbType::DateTimeOffset, "DATETIMEOFFSET")
            .put_default(DbType::Decimal, "DECIMAL")
            .put_with_scale(DbType::Decimal, 38, "DECIMAL($l, $s)", 2)
            .put_default(DbType::Double, "DOUBLE PRECISION")
            .put_default(DbType::Guid, "UNIQUEIDENTIFIER")
            .put_default(DbType::Int16, "SMALLINT")
            .put_default(DbType::Int32, "INT")
            .put_default(DbType::Int64, "BIGINT")
            .put_default(DbType::Single, "REAL")
            .put_default(DbType::StringFixedLength, "NCHAR(255)")
            .put(DbType::StringFixedLength, 4000, "NCHAR($l)")
            .put_default(DbType::String, "NVARCHAR(255)")
            .put(DbType::String, 4000, "NVARCHAR($l)")
            .put(DbType::String, TypeMap::MAX_CAPACITY, "NVARCHAR(MAX)")
            .put_default(DbType::Time, "DATETIME")
            .put_default(DbType::Xml, "XML");

        let mut property_map = PropertyMap::standard();
        property_map.register(ColumnProperty::IDENTITY, "IDENTITY");

        Self {
            type_map,
            property_map,
            fk_actions: ForeignKeyActionMap::standard(),
        }
    }

    fn schema_expr(schema: Option<&str>) -> String {
        schema
            .map(quote_literal)
            .unwrap_or_else(|| "SCHEMA_NAME()".to_string())
    }

    /// `object_id(N'[schema].[name]')` for a table.
    fn object_id(&self, table: &ObjectName) -> String {
        format!(
            "object_id(N{})",
            quote_literal(&self.formatter().table(table))
        )
    }

    /// Predicate on `TABLE_NAME` and `TABLE_SCHEMA`, the current schema when none is given.
    fn information_schema_filter(table: &ObjectName) -> String {
        format!(
            "[TABLE_NAME] = {} AND [TABLE_SCHEMA] = {}",
            quote_literal(&table.name),
            Self::schema_expr(table.schema())
        )
    }

    fn default_constraints_of(&self, table: &ObjectName, column: &str) -> String {
        format!(
            "SELECT [dobj].[name] AS [CONSTRAINT_NAME] FROM [sys].[columns] [col] \
             INNER JOIN [sys].[objects] [dobj] ON [dobj].[object_id] = [col].[default_object_id] AND [dobj].[type] = 'D' \
             WHERE [col].[object_id] = {} AND [col].[name] = {}",
            self.object_id(table),
            quote_literal(column)
        )
    }
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
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

    fn batch_separator(&self) -> Option<&str> {
        Some("GO")
    }

    fn begin_transaction_sql(&self) -> Option<&str> {
        Some("BEGIN TRANSACTION")
    }

    fn default_value_sql(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Text(text) => quote_literal(text),
            DefaultValue::Raw(expr) => expr.clone(),
        }
    }

    fn add_column_sql(&self, table: &ObjectName, column_sql: &str) -> String {
        format!("ALTER TABLE {} ADD {}", self.formatter().table(table), column_sql)
    }

    fn rename_table_sql(&self, table: &ObjectName, new_name: &str) -> Result<String> {
        Ok(format!(
            "EXEC sp_rename {}, {}",
            quote_literal(&table.to_string()),
            quote_literal(new_name)
        ))
    }

    fn rename_column_sql(&self, table: &ObjectName, old: &str, new: &str) -> Result<String> {
        Ok(format!(
            "EXEC sp_rename {}, {}, 'COLUMN'",
            quote_literal(&format!("{}.{}", table, old)),
            quote_literal(new)
        ))
    }

    /// Adds a fresh named default constraint. The previous one, if any, is
    /// dropped first through [`default_constraint_query`](Dialect::default_constraint_query).
    fn change_default_value_sql(
        &self,
        table: &ObjectName,
        column: &str,
        value: Option<&DefaultValue>,
    ) -> Result<Option<String>> {
        let Some(value) = value else {
            return Ok(None);
        };
        let f = self.formatter();
        let constraint = format!("DF_{}", Uuid::new_v4().simple());
        Ok(Some(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
            f.table(table),
            f.name(&constraint),
            self.default_value_sql(value),
            f.name(column)
        )))
    }

    fn default_constraint_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        Some(self.default_constraints_of(table, column))
    }

    fn column_constraints_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        Some(format!(
            "SELECT [CONSTRAINT_NAME] FROM [INFORMATION_SCHEMA].[CONSTRAINT_COLUMN_USAGE] \
             WHERE {} AND [COLUMN_NAME] = {} UNION ALL {}",
            Self::information_schema_filter(table),
            quote_literal(column),
            self.default_constraints_of(table, column)
        ))
    }

    fn table_exists_sql(&self, table: &ObjectName) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM [INFORMATION_SCHEMA].[TABLES] WHERE {}",
            Self::information_schema_filter(table)
        ))
    }

    fn column_exists_sql(&self, table: &ObjectName, column: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM [INFORMATION_SCHEMA].[COLUMNS] WHERE {} AND [COLUMN_NAME] = {}",
            Self::information_schema_filter(table),
            quote_literal(column)
        ))
    }

    fn index_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM [sys].[indexes] WHERE [name] = {} AND [object_id] = {}",
            quote_literal(name),
            self.object_id(table)
        ))
    }

    fn constraint_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        let constraint = self.object_id(&table.sibling(name));
        Ok(format!(
            "SELECT COUNT(*) FROM [sys].[objects] WHERE [parent_object_id] = {} AND [object_id] = {} \
             AND [type] IN ('C', 'D', 'F', 'PK', 'UQ')",
            self.object_id(table),
            constraint
        ))
    }

    fn list_tables_sql(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT [TABLE_NAME], [TABLE_SCHEMA] FROM [INFORMATION_SCHEMA].[TABLES] WHERE [TABLE_SCHEMA] = {}",
            Self::schema_expr(schema.filter(|s| !s.trim().is_empty()))
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnType};

    #[test]
    fn test_dialect_name_and_quoting() {
        let dialect = MssqlDialect::new();
        assert_eq!(dialect.name(), "mssql");
        assert_eq!(dialect.formatter().name("table"), "[table]");
        assert_eq!(dialect.batch_separator(), Some("GO"));
    }

    #[test]
    fn test_identity_column() {
        let dialect = MssqlDialect::new();
        let column = Column::new("Id", ColumnType::new(DbType::Int32))
            .with_property(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY);
        assert_eq!(
            dialect.column_sql(&column, false).unwrap(),
            "[Id] INT NOT NULL PRIMARY KEY IDENTITY"
        );
    }

    #[test]
    fn test_bool_default_becomes_bit() {
        let dialect = MssqlDialect::new();
        let column = Column::new("Active", ColumnType::new(DbType::Boolean))
            .with_property(ColumnProperty::NOT_NULL)
            .with_default(DefaultValue::Bool(false));
        assert_eq!(
            dialect.column_sql(&column, false).unwrap(),
            "[Active] BIT NOT NULL DEFAULT 0"
        );
    }

    #[test]
    fn test_type_map_max_variants() {
        let dialect = MssqlDialect::new();
        let map = dialect.type_map();
        assert_eq!(
            map.get(&ColumnType::new(DbType::String).with_length(5000)).unwrap(),
            "NVARCHAR(MAX)"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::AnsiString).with_length(8000)).unwrap(),
            "VARCHAR(8000)"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::DateTime2).with_length(3)).unwrap(),
            "DATETIME2(3)"
        );
    }

    #[test]
    fn test_add_column_has_no_column_keyword() {
        let dialect = MssqlDialect::new();
        assert_eq!(
            dialect.add_column_sql(&ObjectName::new("t"), "[c] INT"),
            "ALTER TABLE [t] ADD [c] INT"
        );
    }

    #[test]
    fn test_change_column_folds_nullability() {
        let dialect = MssqlDialect::new();
        let change = dialect
            .change_column_sql(&ObjectName::new("t"), "c", "NVARCHAR(50)", Some(false))
            .unwrap();
        assert_eq!(change.type_change, "ALTER TABLE [t] ALTER COLUMN [c] NVARCHAR(50) NULL");
        assert!(change.nullability_change.is_none());
    }

    #[test]
    fn test_renames_use_sp_rename() {
        let dialect = MssqlDialect::new();
        assert_eq!(
            dialect.rename_column_sql(&ObjectName::new("t"), "a", "b").unwrap(),
            "EXEC sp_rename 't.a', 'b', 'COLUMN'"
        );
        assert_eq!(
            dialect
                .rename_table_sql(&ObjectName::new("t").with_schema("dbo"), "u")
                .unwrap(),
            "EXEC sp_rename 'dbo.t', 'u'"
        );
    }

    #[test]
    fn test_change_default_value_adds_named_constraint() {
        let dialect = MssqlDialect::new();
        let sql = dialect
            .change_default_value_sql(&ObjectName::new("t"), "c", Some(&DefaultValue::Int(5)))
            .unwrap()
            .unwrap();
        assert!(sql.starts_with("ALTER TABLE [t] ADD CONSTRAINT [DF_"));
        assert!(sql.ends_with("] DEFAULT 5 FOR [c]"));

        assert!(dialect
            .change_default_value_sql(&ObjectName::new("t"), "c", None)
            .unwrap()
            .is_none());
        assert!(dialect.default_constraint_query(&ObjectName::new("t"), "c").is_some());
    }

    #[test]
    fn test_table_exists_defaults_to_schema_name() {
        let dialect = MssqlDialect::new();
        let sql = dialect.table_exists_sql(&ObjectName::new("SchemaInfo")).unwrap();
        assert!(sql.ends_with("[TABLE_SCHEMA] = SCHEMA_NAME()"));
    }

    #[test]
    fn test_column_lookups_stay_in_current_schema() {
        let dialect = MssqlDialect::new();
        let table = ObjectName::new("t");

        let exists = dialect.column_exists_sql(&table, "c").unwrap();
        assert_eq!(
            exists,
            "SELECT COUNT(*) FROM [INFORMATION_SCHEMA].[COLUMNS] WHERE [TABLE_NAME] = 't' \
             AND [TABLE_SCHEMA] = SCHEMA_NAME() AND [COLUMN_NAME] = 'c'"
        );

        let constraints = dialect.column_constraints_query(&table, "c").unwrap();
        assert!(constraints.contains(
            "[CONSTRAINT_COLUMN_USAGE] WHERE [TABLE_NAME] = 't' AND [TABLE_SCHEMA] = SCHEMA_NAME()"
        ));

        let qualified = dialect
            .column_exists_sql(&ObjectName::new("t").with_schema("sales"), "c")
            .unwrap();
        assert!(qualified.contains("[TABLE_SCHEMA] = 'sales'"));
    }

    #[test]
    fn test_index_exists_uses_object_id() {
        let dialect = MssqlDialect::new();
        let sql = dialect
            .index_exists_sql(&ObjectName::new("t").with_schema("dbo"), "ix")
            .unwrap();
        assert!(sql.contains("[object_id] = object_id(N'[dbo].[t]')"));
    }
}
