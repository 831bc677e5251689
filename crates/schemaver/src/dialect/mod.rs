//! Dialect building blocks shared by every adapter.
//!
//! - [`PropertyMap`]: column property flags to SQL keywords
//! - [`ForeignKeyActionMap`]: referential actions to ON DELETE / ON UPDATE clauses
//! - [`SqlFormatter`]: identifier quoting and column lists
//! - [`ColumnSqlBuilder`]: assembles one column clause in canonical order
//!
//! The adapters themselves live in `drivers/<engine>/dialect.rs`.

mod column;
mod format;

pub use column::ColumnSqlBuilder;
pub use format::SqlFormatter;

use std::collections::HashMap;

use crate::core::schema::{ColumnProperty, ForeignKeyAction};

/// SQL keyword registered per column property.
///
/// Properties without an entry render as nothing.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: HashMap<ColumnProperty, String>,
}

impl PropertyMap {
    /// Map with the entries every dialect shares.
    pub fn standard() -> Self {
        let mut map = Self::default();
        map.register(ColumnProperty::NULL, "NULL")
            .register(ColumnProperty::NOT_NULL, "NOT NULL")
            .register(ColumnProperty::UNIQUE, "UNIQUE")
            .register(ColumnProperty::PRIMARY_KEY, "PRIMARY KEY");
        map
    }

    pub fn register(&mut self, property: ColumnProperty, sql: impl Into<String>) -> &mut Self {
        self.entries.insert(property, sql.into());
        self
    }

    /// SQL for a property, or an empty string when none is registered.
    pub fn sql_for(&self, property: ColumnProperty) -> &str {
        self.entries.get(&property).map(String::as_str).unwrap_or("")
    }
}

/// SQL keyword registered per referential action.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyActionMap {
    entries: HashMap<ForeignKeyAction, String>,
}

impl ForeignKeyActionMap {
    /// Map with the ANSI spelling of every action.
    pub fn standard() -> Self {
        let mut map = Self::default();
        map.register(ForeignKeyAction::Cascade, "CASCADE")
            .register(ForeignKeyAction::SetDefault, "SET DEFAULT")
            .register(ForeignKeyAction::SetNull, "SET NULL")
            .register(ForeignKeyAction::NoAction, "NO ACTION");
        map
    }

    pub fn register(&mut self, action: ForeignKeyAction, sql: impl Into<String>) -> &mut Self {
        self.entries.insert(action, sql.into());
        self
    }

    /// `ON DELETE <action>`, or empty when the action maps to nothing.
    pub fn on_delete(&self, action: ForeignKeyAction) -> String {
        self.clause("ON DELETE", action)
    }

    /// `ON UPDATE <action>`, or empty when the action maps to nothing.
    pub fn on_update(&self, action: ForeignKeyAction) -> String {
        self.clause("ON UPDATE", action)
    }

    fn clause(&self, prefix: &str, action: ForeignKeyAction) -> String {
        match self.entries.get(&action) {
            Some(sql) if !sql.trim().is_empty() => format!("{} {}", prefix, sql),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_property_map() {
        let map = PropertyMap::standard();
        assert_eq!(map.sql_for(ColumnProperty::NOT_NULL), "NOT NULL");
        assert_eq!(map.sql_for(ColumnProperty::PRIMARY_KEY), "PRIMARY KEY");
        assert_eq!(map.sql_for(ColumnProperty::IDENTITY), "");
    }

    #[test]
    fn test_register_overrides_entry() {
        let mut map = PropertyMap::standard();
        map.register(ColumnProperty::NULL, "");
        map.register(ColumnProperty::IDENTITY, "IDENTITY");
        assert_eq!(map.sql_for(ColumnProperty::NULL), "");
        assert_eq!(map.sql_for(ColumnProperty::IDENTITY), "IDENTITY");
    }

    #[test]
    fn test_fk_action_clauses() {
        let map = ForeignKeyActionMap::standard();
        assert_eq!(map.on_delete(ForeignKeyAction::Cascade), "ON DELETE CASCADE");
        assert_eq!(map.on_update(ForeignKeyAction::SetNull), "ON UPDATE SET NULL");
        assert_eq!(map.on_delete(ForeignKeyAction::NoAction), "ON DELETE NO ACTION");
    }

    #[test]
    fn test_blank_or_missing_action_renders_nothing() {
        let mut map = ForeignKeyActionMap::standard();
        map.register(ForeignKeyAction::NoAction, "");
        assert_eq!(map.on_delete(ForeignKeyAction::NoAction), "");
        assert_eq!(ForeignKeyActionMap::default().on_update(ForeignKeyAction::Cascade), "");
    }
}
