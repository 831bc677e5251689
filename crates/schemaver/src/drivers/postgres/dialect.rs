//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Double-quoted identifiers, `GENERATED BY DEFAULT AS IDENTITY` columns and
//! separate statements for type and nullability changes.

use crate::core::identifier::{quote_literal, QuoteStyle};
use crate::core::schema::{ColumnProperty, DbType, ObjectName};
use crate::core::traits::{ColumnChange, Dialect};
use crate::dialect::{ForeignKeyActionMap, PropertyMap};
use crate::error::Result;
use crate::typemap::TypeMap;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    type_map: TypeMap,
    property_map: PropertyMap,
    fk_actions: ForeignKeyActionMap,
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        let mut type_map = TypeMap::new();
        type_map
            .put_default(DbType::AnsiStringFixedLength, "char(255)")
            .put(DbType::AnsiStringFixedLength, 10_485_760, "char($l)")
            .put_default(DbType::AnsiString, "varchar(255)")
            .put(DbType::AnsiString, 10_485_760, "varchar($l)")
            .put(DbType::AnsiString, TypeMap::MAX_CAPACITY, "text")
            .put_default(DbType::Binary, "bytea")
            .put_default(DbType::Boolean, "boolean")
            .put_default(DbType::Byte, "int2")
            .put_default(DbType::Currency, "money")
            .put_default(DbType::Date, "date")
            .put_default(DbType::DateTime, "timestamp")
            .put_default(DbType::DateTime2, "timestamp")
            .put(DbType::DateTime2, 6, "timestamp($l)")
            .put_default(DbType::DateTimeOffset, "timestamptz")
            .put_default(DbType::Decimal, "numeric")
            .put_with_scale(DbType::Decimal, 1000, "numeric($l, $s)", 2)
            .put_default(DbType::Double, "float8")
            .put_default(DbType::Guid, "uuid")
            .put_default(DbType::Int16, "int2")
            .put_default(DbType::Int32, "int4")
            .put_default(DbType::Int64, "int8")
            .put_default(DbType::Single, "float4")
            .put_default(DbType::StringFixedLength, "char(255)")
            .put(DbType::StringFixedLength, 10_485_760, "char($l)")
            .put_default(DbType::String, "varchar(255)")
            .put(DbType::String, 10_485_760, "varchar($l)")
            .put(DbType::String, TypeMap::MAX_CAPACITY, "text")
            .put_default(DbType::Time, "time")
            .put_default(DbType::Xml, "xml");

        let mut property_map = PropertyMap::standard();
        property_map.register(ColumnProperty::IDENTITY, "GENERATED BY DEFAULT AS IDENTITY");

        Self {
            type_map,
            property_map,
            fk_actions: ForeignKeyActionMap::standard(),
        }
    }

    fn schema_literal(schema: Option<&str>) -> String {
        schema
            .map(quote_literal)
            .unwrap_or_else(|| "current_schema()".to_string())
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
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

    fn change_column_sql(
        &self,
        table: &ObjectName,
        column: &str,
        type_sql: &str,
        not_null: Option<bool>,
    ) -> Result<ColumnChange> {
        let f = self.formatter();
        let prefix = format!("ALTER TABLE {} ALTER COLUMN {}", f.table(table), f.name(column));
        Ok(ColumnChange {
            type_change: format!("{} TYPE {}", prefix, type_sql),
            nullability_change: not_null.map(|nn| {
                format!("{} {}", prefix, if nn { "SET NOT NULL" } else { "DROP NOT NULL" })
            }),
        })
    }

    fn remove_index_sql(&self, name: &str, table: &ObjectName) -> String {
        format!("DROP INDEX {}", self.formatter().table(&table.sibling(name)))
    }

    fn table_exists_sql(&self, table: &ObjectName) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = {} AND table_schema = {}",
            quote_literal(&table.name),
            Self::schema_literal(table.schema())
        ))
    }

    fn column_exists_sql(&self, table: &ObjectName, column: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.columns WHERE table_name = {} AND column_name = {} AND table_schema = {}",
            quote_literal(&table.name),
            quote_literal(column),
            Self::schema_literal(table.schema())
        ))
    }

    fn index_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM pg_indexes WHERE indexname = {} AND tablename = {} AND schemaname = {}",
            quote_literal(name),
            quote_literal(&table.name),
            Self::schema_literal(table.schema())
        ))
    }

    fn constraint_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.table_constraints WHERE constraint_name = {} AND table_name = {} AND table_schema = {}",
            quote_literal(name),
            quote_literal(&table.name),
            Self::schema_literal(table.schema())
        ))
    }

    fn list_tables_sql(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT table_name, table_schema FROM information_schema.tables WHERE table_schema = {} AND table_type = 'BASE TABLE' ORDER BY table_name",
            Self::schema_literal(schema.filter(|s| !s.trim().is_empty()))
        ))
    }
}
