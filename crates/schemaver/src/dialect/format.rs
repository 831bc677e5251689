//! Identifier rendering for generated statements.

use crate::core::identifier::QuoteStyle;
use crate::core::schema::ObjectName;

/// Renders quoted names and column lists in one dialect's quoting style.
#[derive(Debug, Clone, Copy)]
pub struct SqlFormatter {
    quote: QuoteStyle,
}

impl SqlFormatter {
    pub fn new(quote: QuoteStyle) -> Self {
        Self { quote }
    }

    /// A single quoted identifier.
    pub fn name(&self, name: &str) -> String {
        self.quote.quote(name)
    }

    /// A quoted `schema.name`, or just the name when no schema is set.
    pub fn table(&self, object: &ObjectName) -> String {
        match object.schema() {
            Some(schema) => format!("{}.{}", self.name(schema), self.name(&object.name)),
            None => self.name(&object.name),
        }
    }

    /// Comma-separated quoted column names.
    pub fn cols<S: AsRef<str>>(&self, columns: &[S]) -> String {
        columns
            .iter()
            .map(|c| self.name(c.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
