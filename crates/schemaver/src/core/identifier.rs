//! Identifier validation and quoting.
//!
//! SQL identifiers (table names, column names, schema names) cannot be passed as
//! parameters in prepared statements, so every generated statement embeds them
//! as quoted text. Names are validated first, then wrapped in the dialect's
//! quote characters with any embedded closing quote doubled.

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects:
/// - Empty or blank identifiers
/// - Identifiers containing null bytes
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns `MigrateError::Argument` with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MigrateError::Argument(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Argument(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Argument(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Identifier quoting convention of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `"name"` (PostgreSQL, Oracle, ANSI).
    DoubleQuote,
    /// `[name]` (SQL Server, SQLite).
    Bracket,
    /// `` `name` `` (MySQL).
    Backtick,
}

impl QuoteStyle {
    /// Quote an identifier, doubling the closing quote character inside it.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// assert_eq!(QuoteStyle::DoubleQuote.quote("table\"name"), "\"table\"\"name\"");
    /// assert_eq!(QuoteStyle::Bracket.quote("table]name"), "[table]]name]");
    /// ```
    pub fn quote(self, name: &str) -> String {
        match self {
            QuoteStyle::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Bracket => format!("[{}]", name.replace(']', "]]")),
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
        }
    }
}

/// Render a string as a single-quoted SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("User Table").is_ok());
        assert!(validate_identifier("table_123").is_ok());
        assert!(validate_identifier("名前").is_ok());
    }

    #[test]
    fn test_validate_identifier_empty() {
        assert!(matches!(
            validate_identifier(""),
            Err(MigrateError::Argument(_))
        ));
        assert!(validate_identifier("   ").is_err());
    }

    #[test]
    fn test_validate_identifier_null_byte() {
        let result = validate_identifier("users\0--");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_too_long() {
        let long_name = "a".repeat(129);
        assert!(validate_identifier(&long_name).is_err());
        assert!(validate_identifier(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_quote_double_quote() {
        assert_eq!(QuoteStyle::DoubleQuote.quote("users"), "\"users\"");
        assert_eq!(
            QuoteStyle::DoubleQuote.quote("table\"name"),
            "\"table\"\"name\""
        );
    }

    #[test]
    fn test_quote_bracket() {
        assert_eq!(QuoteStyle::Bracket.quote("users"), "[users]");
        assert_eq!(QuoteStyle::Bracket.quote("table]name"), "[table]]name]");
    }

    #[test]
    fn test_quote_backtick() {
        assert_eq!(QuoteStyle::Backtick.quote("users"), "`users`");
        assert_eq!(QuoteStyle::Backtick.quote("table`name"), "`table``name`");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
