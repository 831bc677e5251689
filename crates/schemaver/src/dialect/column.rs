//! Column clause assembly.

use crate::core::identifier::validate_identifier;
use crate::core::schema::{Column, ColumnProperty};
use crate::core::traits::Dialect;
use crate::error::Result;

/// Builds the SQL for one column definition, token by token.
///
/// [`build`](Self::build) uses the canonical order: name, type, identity
/// (when the dialect drops the type), unsigned, not-null (unless part of a
/// composite key), inline primary key, identity (when the dialect keeps the
/// type), unique, default. Dialects with a different order call the
/// `append_*` steps themselves and finish with [`finish`](Self::finish).
pub struct ColumnSqlBuilder<'a, D: Dialect + ?Sized> {
    dialect: &'a D,
    column: &'a Column,
    compound_primary_key: bool,
    parts: Vec<String>,
}

impl<'a, D: Dialect + ?Sized> ColumnSqlBuilder<'a, D> {
    /// Start a clause for `column`; fails on an invalid column name.
    pub fn new(dialect: &'a D, column: &'a Column, compound_primary_key: bool) -> Result<Self> {
        validate_identifier(&column.name)?;
        Ok(Self {
            dialect,
            column,
            compound_primary_key,
            parts: Vec::new(),
        })
    }

    pub fn build(self) -> Result<String> {
        Ok(self
            .append_name()
            .append_type()?
            .append_identity_without_type()
            .append_unsigned()
            .append_not_null()
            .append_primary_key()
            .append_identity_with_type()
            .append_unique()
            .append_default()
            .finish())
    }

    pub fn append_name(mut self) -> Self {
        let name = self.dialect.formatter().name(&self.column.name);
        self.parts.push(name);
        self
    }

    pub fn append_type(mut self) -> Result<Self> {
        if !(self.column.is_identity() && !self.dialect.identity_needs_type()) {
            let sql = self.dialect.column_type_sql(&self.column.column_type)?;
            self.parts.push(sql);
        }
        Ok(self)
    }

    pub fn append_identity_without_type(self) -> Self {
        if self.dialect.identity_needs_type() {
            self
        } else {
            self.append_if_set(ColumnProperty::IDENTITY)
        }
    }

    pub fn append_unsigned(self) -> Self {
        self.append_if_set(ColumnProperty::UNSIGNED)
    }

    /// NOT NULL, skipped for members of a composite key and, unless the
    /// dialect requires it, for an inline key.
    pub fn append_not_null(self) -> Self {
        let key_column = self.column.is_primary_key();
        if key_column && (self.compound_primary_key || !self.dialect.needs_not_null_for_identity()) {
            self
        } else {
            self.append_if_set(ColumnProperty::NOT_NULL)
        }
    }

    pub fn append_primary_key(self) -> Self {
        if self.compound_primary_key {
            self
        } else {
            self.append_if_set(ColumnProperty::PRIMARY_KEY)
        }
    }

    pub fn append_identity_with_type(self) -> Self {
        if self.dialect.identity_needs_type() {
            self.append_if_set(ColumnProperty::IDENTITY)
        } else {
            self
        }
    }

    pub fn append_unique(self) -> Self {
        self.append_if_set(ColumnProperty::UNIQUE)
    }

    pub fn append_default(mut self) -> Self {
        if let Some(value) = &self.column.default_value {
            let sql = format!("DEFAULT {}", self.dialect.default_value_sql(value));
            self.parts.push(sql);
        }
        self
    }

    pub fn append_raw(mut self, sql: impl Into<String>) -> Self {
        self.parts.push(sql.into());
        self
    }

    /// Append the property's keyword if the column has every one of its flags
    /// and the dialect maps it to something.
    pub fn append_if_set(mut self, property: ColumnProperty) -> Self {
        if self.column.properties.has(property) {
            let sql = self.dialect.property_map().sql_for(property);
            if !sql.is_empty() {
                self.parts.push(sql.to_string());
            }
        }
        self
    }

    pub fn finish(self) -> String {
        self.parts.join(" ")
    }
}
