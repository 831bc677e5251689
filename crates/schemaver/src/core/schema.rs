//! Portable schema description types.
//!
//! These types describe tables, columns and constraints independently of any
//! SQL dialect. The dialect adapters in `drivers` turn them into statements.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Abstract column data type, resolved to dialect SQL through a [`TypeMap`].
///
/// [`TypeMap`]: crate::typemap::TypeMap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    Binary,
    Boolean,
    Byte,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    StringFixedLength,
    Time,
    UInt16,
    UInt32,
    UInt64,
    VarNumeric,
    Xml,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A column's abstract type with optional length and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub db_type: DbType,
    pub length: Option<u32>,
    pub scale: Option<u32>,
}

impl ColumnType {
    pub fn new(db_type: DbType) -> Self {
        Self {
            db_type,
            length: None,
            scale: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.length, self.scale) {
            (Some(length), Some(scale)) => write!(f, "{}({}, {})", self.db_type, length, scale),
            (Some(length), None) => write!(f, "{}({})", self.db_type, length),
            _ => write!(f, "{}", self.db_type),
        }
    }
}

bitflags! {
    /// Column property flags.
    ///
    /// `PRIMARY_KEY` includes `NOT_NULL`, so a key column always reports both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ColumnProperty: u32 {
        const NULL = 1;
        const NOT_NULL = 1 << 1;
        const IDENTITY = 1 << 2;
        const UNIQUE = 1 << 3;
        const UNSIGNED = 1 << 4;
        const PRIMARY_KEY = (1 << 5) | Self::NOT_NULL.bits();
        const PRIMARY_KEY_WITH_IDENTITY = Self::PRIMARY_KEY.bits() | Self::IDENTITY.bits();
    }
}

impl ColumnProperty {
    /// True when every flag of `other` is set.
    pub fn has(self, other: ColumnProperty) -> bool {
        self.contains(other)
    }
}

/// Default value attached to a column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// Rendered per dialect: `true`/`false` or `1`/`0`.
    Bool(bool),
    Int(i64),
    /// A string literal, quoted with embedded quotes doubled.
    Text(String),
    /// A raw SQL expression emitted verbatim, e.g. `CURRENT_TIMESTAMP`.
    Raw(String),
}

/// Portable column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub properties: ColumnProperty,
    pub default_value: Option<DefaultValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            properties: ColumnProperty::empty(),
            default_value: None,
        }
    }

    pub fn with_property(mut self, property: ColumnProperty) -> Self {
        self.properties |= property;
        self
    }

    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn is_identity(&self) -> bool {
        self.properties.has(ColumnProperty::IDENTITY)
    }

    pub fn is_primary_key(&self) -> bool {
        self.properties.has(ColumnProperty::PRIMARY_KEY)
    }
}

/// A table, index or constraint name with an optional schema.
///
/// A blank schema is stored as `None`, so it compares equal to an absent one
/// and both mean "the connection's current schema".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub name: String,
    pub schema: Option<String>,
}

impl ObjectName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.schema = if schema.trim().is_empty() {
            None
        } else {
            Some(schema)
        };
        self
    }

    /// Schema name, if one was given.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// A name in the same schema as `self`.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: self.schema.clone(),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
}
