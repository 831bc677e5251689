//! Abstract column type to dialect SQL type resolution.
//!
//! Each dialect registers, per [`DbType`], an optional default pattern plus any
//! number of patterns keyed by capacity. A lookup with a length picks the entry
//! with the smallest capacity that still holds the length; without a length, or
//! when the length exceeds every capacity, the default pattern is used.
//!
//! Patterns may contain `$l` (length) and `$s` (scale) placeholders. Each is
//! substituted at most once.

use std::collections::{BTreeMap, HashMap};

use crate::core::schema::{ColumnType, DbType};
use crate::error::{MigrateError, Result};

/// Length placeholder in type patterns.
pub const LENGTH_PLACEHOLDER: &str = "$l";

/// Scale placeholder in type patterns.
pub const SCALE_PLACEHOLDER: &str = "$s";

#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeDefinition {
    pattern: String,
    default_scale: Option<u32>,
}

/// Registry of SQL type patterns for one dialect.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    by_capacity: HashMap<DbType, BTreeMap<u32, TypeDefinition>>,
    defaults: HashMap<DbType, String>,
}

impl TypeMap {
    /// Capacity used for "unbounded" variants such as `VARCHAR(MAX)`.
    pub const MAX_CAPACITY: u32 = i32::MAX as u32;

    pub fn new() -> Self {
        Self::default()
    }

    /// Register the pattern used when no capacity entry applies.
    pub fn put_default(&mut self, db_type: DbType, pattern: impl Into<String>) -> &mut Self {
        self.defaults.insert(db_type, pattern.into());
        self
    }

    /// Register a pattern for lengths up to `capacity`.
    pub fn put(&mut self, db_type: DbType, capacity: u32, pattern: impl Into<String>) -> &mut Self {
        self.insert(db_type, capacity, pattern.into(), None)
    }

    /// Register a pattern for lengths up to `capacity`, with the scale used
    /// when the column type gives none.
    pub fn put_with_scale(
        &mut self,
        db_type: DbType,
        capacity: u32,
        pattern: impl Into<String>,
        default_scale: u32,
    ) -> &mut Self {
        self.insert(db_type, capacity, pattern.into(), Some(default_scale))
    }

    fn insert(
        &mut self,
        db_type: DbType,
        capacity: u32,
        pattern: String,
        default_scale: Option<u32>,
    ) -> &mut Self {
        self.by_capacity.entry(db_type).or_default().insert(
            capacity,
            TypeDefinition {
                pattern,
                default_scale,
            },
        );
        self
    }

    /// Whether any pattern is registered for `db_type`.
    pub fn has_type(&self, db_type: DbType) -> bool {
        self.by_capacity.contains_key(&db_type) || self.defaults.contains_key(&db_type)
    }

    /// Resolve a column type to SQL.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::UnsupportedType` when no entry applies.
    pub fn get(&self, column_type: &ColumnType) -> Result<String> {
        let matched = column_type.length.and_then(|length| {
            self.by_capacity
                .get(&column_type.db_type)
                .and_then(|entries| entries.range(length..).next())
                .map(|(_, definition)| definition)
        });

        let (pattern, default_scale) = match matched {
            Some(definition) => (definition.pattern.as_str(), definition.default_scale),
            None => match self.defaults.get(&column_type.db_type) {
                Some(pattern) => (pattern.as_str(), None),
                None => {
                    return Err(MigrateError::UnsupportedType(column_type.to_string()));
                }
            },
        };

        Ok(substitute(
            pattern,
            column_type.length,
            column_type.scale.or(default_scale),
        ))
    }
}

fn substitute(pattern: &str, length: Option<u32>, scale: Option<u32>) -> String {
    let mut sql = pattern.to_string();
    if let Some(length) = length {
        sql = sql.replacen(LENGTH_PLACEHOLDER, &length.to_string(), 1);
    }
    if let Some(scale) = scale {
        sql = sql.replacen(SCALE_PLACEHOLDER, &scale.to_string(), 1);
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_map() -> TypeMap {
        let mut map = TypeMap::new();
        map.put_default(DbType::String, "NVARCHAR(255)")
            .put(DbType::String, 4000, "NVARCHAR($l)")
            .put(DbType::String, TypeMap::MAX_CAPACITY, "NVARCHAR(MAX)")
            .put_default(DbType::Decimal, "DECIMAL")
            .put_with_scale(DbType::Decimal, 38, "DECIMAL($l, $s)", 2);
        map
    }

    #[test]
    fn test_default_without_length() {
        let map = string_map();
        assert_eq!(
            map.get(&ColumnType::new(DbType::String)).unwrap(),
            "NVARCHAR(255)"
        );
    }

    #[test]
    fn test_smallest_capacity_that_fits() {
        let map = string_map();
        assert_eq!(
            map.get(&ColumnType::new(DbType::String).with_length(100)).unwrap(),
            "NVARCHAR(100)"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::String).with_length(4000)).unwrap(),
            "NVARCHAR(4000)"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::String).with_length(4001)).unwrap(),
            "NVARCHAR(MAX)"
        );
    }

    #[test]
    fn test_length_beyond_every_capacity_uses_default() {
        let mut map = TypeMap::new();
        map.put_default(DbType::Binary, "LONGBLOB")
            .put(DbType::Binary, 127, "TINYBLOB")
            .put(DbType::Binary, 65535, "BLOB");
        assert_eq!(
            map.get(&ColumnType::new(DbType::Binary).with_length(100_000)).unwrap(),
            "LONGBLOB"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::Binary).with_length(100)).unwrap(),
            "TINYBLOB"
        );
    }

    #[test]
    fn test_default_scale_applies_when_scale_missing() {
        let map = string_map();
        assert_eq!(
            map.get(&ColumnType::new(DbType::Decimal).with_length(10)).unwrap(),
            "DECIMAL(10, 2)"
        );
        assert_eq!(
            map.get(&ColumnType::new(DbType::Decimal).with_length(10).with_scale(5))
                .unwrap(),
            "DECIMAL(10, 5)"
        );
    }

    #[test]
    fn test_placeholders_replaced_once() {
        let mut map = TypeMap::new();
        map.put(DbType::AnsiString, 10, "X($l,$l)");
        assert_eq!(
            map.get(&ColumnType::new(DbType::AnsiString).with_length(3)).unwrap(),
            "X(3,$l)"
        );
    }

    #[test]
    fn test_unregistered_type_fails() {
        let map = string_map();
        let err = map.get(&ColumnType::new(DbType::Guid)).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedType(ref t) if t == "Guid"));
        assert!(!map.has_type(DbType::Guid));
        assert!(map.has_type(DbType::String));
    }

    #[test]
    fn test_capacity_only_type_without_length_fails() {
        let mut map = TypeMap::new();
        map.put(DbType::Xml, 10, "XML($l)");
        assert!(map.has_type(DbType::Xml));
        assert!(map.get(&ColumnType::new(DbType::Xml)).is_err());
    }
}
