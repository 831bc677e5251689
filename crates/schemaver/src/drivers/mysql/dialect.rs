//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Backtick-quoted identifiers, `AUTO_INCREMENT` after the column type and
//! `MODIFY` for column changes. Column renames and check constraints are
//! refused, as is the SET DEFAULT referential action.

use crate::core::identifier::{quote_literal, QuoteStyle};
use crate::core::schema::{ColumnProperty, DbType, DefaultValue, ForeignKeyAction, ObjectName};
use crate::core::traits::{ColumnChange, Dialect};
use crate::dialect::{ForeignKeyActionMap, PropertyMap};
use crate::error::{MigrateError, Result};
use crate::typemap::TypeMap;

/// MySQL dialect implementation.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    type_map: TypeMap,
    property_map: PropertyMap,
    fk_actions: ForeignKeyActionMap,
}

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        let mut type_map = TypeMap::new();
        for text_type in [DbType::AnsiStringFixedLength, DbType::StringFixedLength] {
            type_map
                .put_default(text_type, "CHAR(255)")
                .put(text_type, 255, "CHAR($l)")
                .put(text_type, 65_535, "TEXT")
                .put(text_type, 16_777_215, "MEDIUMTEXT");
        }
        for text_type in [DbType::AnsiString, DbType::String] {
            type_map
                .put_default(text_type, "VARCHAR(255)")
                .put(text_type, 255, "VARCHAR($l)")
                .put(text_type, 65_535, "TEXT")
                .put(text_type, 16_777_215, "MEDIUMTEXT");
        }
        type_map
            .put_default(DbType::Binary, "LONGBLOB")
            .put(DbType::Binary, 127, "TINYBLOB")
            .put(DbType::Binary, 65_535, "BLOB")
            .put(DbType::Binary, 16_777_215, "MEDIUMBLOB")
            .put_default(DbType::Boolean, "TINYINT(1)")
            .put_default(DbType::Byte, "TINYINT UNSIGNED")
            .put_default(DbType::Currency, "MONEY")
            .put_default(DbType::Date, "DATE")
            .put_default(DbType::DateTime, "DATETIME")
            .put_default(DbType::Decimal, "NUMERIC")
            .put_with_scale(DbType::Decimal, 38, "NUMERIC($l, $s)", 2)
            .put_default(DbType::Double, "DOUBLE")
            .put_default(DbType::Guid, "VARCHAR(40)")
            .put_default(DbType::Int16, "SMALLINT")
            .put_default(DbType::Int32, "INTEGER")
            .put_default(DbType::Int64, "BIGINT")
            .put_default(DbType::Single, "FLOAT")
            .put_default(DbType::Time, "TIME");

        let mut property_map = PropertyMap::standard();
        property_map
            .register(ColumnProperty::UNSIGNED, "UNSIGNED")
            .register(ColumnProperty::IDENTITY, "AUTO_INCREMENT");

        Self {
            type_map,
            property_map,
            fk_actions: ForeignKeyActionMap::standard(),
        }
    }

    fn schema_expr(schema: Option<&str>) -> String {
        schema
            .map(quote_literal)
            .unwrap_or_else(|| "SCHEMA()".to_string())
    }

    fn table_filter(table: &ObjectName) -> String {
        format!(
            "TABLE_NAME = {} AND TABLE_SCHEMA = {}",
            quote_literal(&table.name),
            Self::schema_expr(table.schema())
        )
    }
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
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

    fn rename_table_sql(&self, table: &ObjectName, new_name: &str) -> Result<String> {
        let f = self.formatter();
        Ok(format!(
            "ALTER TABLE {} RENAME TO {}",
            f.table(table),
            f.table(&table.sibling(new_name))
        ))
    }

    fn rename_column_sql(&self, _table: &ObjectName, _old: &str, _new: &str) -> Result<String> {
        Err(MigrateError::unsupported(self.name(), "column rename"))
    }

    fn add_check_constraint_sql(
        &self,
        _name: &str,
        _table: &ObjectName,
        _check_sql: &str,
    ) -> Result<String> {
        Err(MigrateError::unsupported(self.name(), "check constraints"))
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
        if on_delete == ForeignKeyAction::SetDefault || on_update == ForeignKeyAction::SetDefault {
            return Err(MigrateError::unsupported(
                self.name(),
                "the SET DEFAULT foreign key action",
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
        for clause in [self.fk_actions.on_update(on_update), self.fk_actions.on_delete(on_delete)] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(&clause);
            }
        }
        Ok(sql)
    }

    fn constraint_type_query(&self, table: &ObjectName, name: &str) -> Option<String> {
        Some(format!(
            "SELECT CONSTRAINT_TYPE FROM information_schema.TABLE_CONSTRAINTS WHERE {} AND CONSTRAINT_NAME = {}",
            Self::table_filter(table),
            quote_literal(name)
        ))
    }

    fn remove_constraint_sql(
        &self,
        table: &ObjectName,
        name: &str,
        constraint_type: Option<&str>,
    ) -> Result<String> {
        let f = self.formatter();
        let target = match constraint_type.map(|t| t.trim().to_uppercase()).as_deref() {
            Some("PRIMARY KEY") => "PRIMARY KEY".to_string(),
            Some("FOREIGN KEY") => format!("FOREIGN KEY {}", f.name(name)),
            Some("CHECK") => format!("CHECK {}", f.name(name)),
            _ => format!("INDEX {}", f.name(name)),
        };
        Ok(format!("ALTER TABLE {} DROP {}", f.table(table), target))
    }

    fn column_constraints_query(&self, table: &ObjectName, column: &str) -> Option<String> {
        Some(format!(
            "SELECT CONSTRAINT_NAME FROM information_schema.KEY_COLUMN_USAGE WHERE {} AND COLUMN_NAME = {} \
             AND REFERENCED_TABLE_NAME IS NOT NULL",
            Self::table_filter(table),
            quote_literal(column)
        ))
    }

    fn table_exists_sql(&self, table: &ObjectName) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.TABLES WHERE {}",
            Self::table_filter(table)
        ))
    }

    fn column_exists_sql(&self, table: &ObjectName, column: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.COLUMNS WHERE {} AND COLUMN_NAME = {}",
            Self::table_filter(table),
            quote_literal(column)
        ))
    }

    fn index_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.STATISTICS WHERE {} AND INDEX_NAME = {}",
            Self::table_filter(table),
            quote_literal(name)
        ))
    }

    fn constraint_exists_sql(&self, table: &ObjectName, name: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM information_schema.TABLE_CONSTRAINTS WHERE {} AND CONSTRAINT_NAME = {}",
            Self::table_filter(table),
            quote_literal(name)
        ))
    }

    fn list_tables_sql(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT TABLE_NAME, TABLE_SCHEMA FROM information_schema.TABLES WHERE TABLE_SCHEMA = {}",
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
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.name(), "mysql");
        assert_eq!(dialect.formatter().name("table"), "`table`");
    }

    #[test]
    fn test_auto_increment_identity_keeps_type() {
        // MySQL rejects AUTO_INCREMENT on a column without a data type
        let dialect = MysqlDialect::new();
        let column = Column::new("id", ColumnType::new(DbType::Int32))
            .with_property(ColumnProperty::PRIMARY_KEY_WITH_IDENTITY | ColumnProperty::UNSIGNED);
        assert_eq!(
            dialect.column_sql(&column, false).unwrap(),
            "`id` INTEGER UNSIGNED NOT NULL PRIMARY KEY AUTO_INCREMENT"
        );
    }

    #[test]
    fn test_type_map_text_capacities() {
        let dialect = MysqlDialect::new();
        let map = dialect.type_map();
        assert_eq!(
            map.get(&ColumnType::new(DbType::String).with_length(200)).unwrap(),
            "VARCHAR(200)"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::String).with_length(1000)).unwrap(),
            "TEXT"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::Binary).with_length(100)).unwrap(),
            "TINYBLOB"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::Binary).with_length(20_000_000)).unwrap(),
            "LONGBLOB"
        );
    }

    #[test]
    fn test_change_column_uses_modify() {
        let dialect = MysqlDialect::new();
        let change = dialect
            .change_column_sql(&ObjectName::new("t"), "c", "INTEGER", Some(true))
            .unwrap();
        assert_eq!(change.type_change, "ALTER TABLE `t` MODIFY `c` INTEGER NOT NULL");
        assert!(change.nullability_change.is_none());
    }

    #[test]
    fn test_unsupported_operations() {
        let dialect = MysqlDialect::new();
        let table = ObjectName::new("t");
        assert!(matches!(
            dialect.rename_column_sql(&table, "a", "b"),
            Err(MigrateError::Unsupported(_))
        ));
        assert!(matches!(
            dialect.add_check_constraint_sql("ck", &table, "a > 0"),
            Err(MigrateError::Unsupported(_))
        ));
        assert!(matches!(
            dialect.add_foreign_key_sql(
                "fk",
                &table,
                &["a"],
                &ObjectName::new("u"),
                &["id"],
                ForeignKeyAction::SetDefault,
                ForeignKeyAction::NoAction
            ),
            Err(MigrateError::Unsupported(_))
        ));
    }

    #[test]
    fn test_remove_constraint_by_type() {
        let dialect = MysqlDialect::new();
        let table = ObjectName::new("t");
        assert_eq!(
            dialect.remove_constraint_sql(&table, "PRIMARY", Some("PRIMARY KEY")).unwrap(),
            "ALTER TABLE `t` DROP PRIMARY KEY"
        );
        assert_eq!(
            dialect.remove_constraint_sql(&table, "fk", Some("FOREIGN KEY")).unwrap(),
            "ALTER TABLE `t` DROP FOREIGN KEY `fk`"
        );
        assert_eq!(
            dialect.remove_constraint_sql(&table, "uq", Some("UNIQUE")).unwrap(),
            "ALTER TABLE `t` DROP INDEX `uq`"
        );
        assert!(dialect.constraint_type_query(&table, "fk").is_some());
    }

    #[test]
    fn test_rename_table_keeps_schema() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect
                .rename_table_sql(&ObjectName::new("a").with_schema("db"), "b")
                .unwrap(),
            "ALTER TABLE `db`.`a` RENAME TO `db`.`b`"
        );
    }
}
