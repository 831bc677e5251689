//! Row values flowing in and out of the provider.
//!
//! [`Row`] carries query results as text cells; [`RowValues`] is the ordered
//! column-to-literal mapping used to build INSERT and UPDATE statements.

use crate::error::{MigrateError, Result};

/// One result row, every cell rendered as text. `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(pub Vec<Option<String>>);

impl Row {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self(cells)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text of a cell; `None` for NULL or a missing index.
    pub fn get_str(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).and_then(|cell| cell.as_deref())
    }

    /// Parse a cell as an integer.
    pub fn get_i64(&self, idx: usize) -> Result<Option<i64>> {
        match self.get_str(idx) {
            None => Ok(None),
            Some(text) => text.trim().parse::<i64>().map(Some).map_err(|_| {
                MigrateError::Argument(format!("Column {} is not an integer: {:?}", idx, text))
            }),
        }
    }
}

/// Ordered column-to-value mapping for INSERT and UPDATE.
///
/// Values are kept as raw text; the provider quotes them, doubling embedded
/// single quotes, and renders `None` as the literal `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowValues {
    entries: Vec<(String, Option<String>)>,
}

impl RowValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column with a value.
    pub fn with(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push((column.into(), Some(value.to_string())));
        self
    }

    /// Append a column set to NULL.
    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.entries.push((column.into(), None));
        self
    }

    /// Append a column whose value may be NULL.
    pub fn with_opt(mut self, column: impl Into<String>, value: Option<impl ToString>) -> Self {
        self.entries
            .push((column.into(), value.map(|v| v.to_string())));
        self
    }

    pub fn columns(&self) -> Vec<&str> {
        self.entries.iter().map(|(c, _)| c.as_str()).collect()
    }

    pub fn values(&self) -> Vec<Option<&str>> {
        self.entries.iter().map(|(_, v)| v.as_deref()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v.as_deref()))
    }
}

/// Render a value as a SQL literal: `null`, or single-quoted with `'` doubled.
pub fn quote_value(value: Option<&str>) -> String {
    match value {
        None => "null".to_string(),
        Some(v) => format!("'{}'", v.replace('\'', "''")),
    }
}
