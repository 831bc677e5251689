//! Offline connection that records SQL instead of running it.
//!
//! Queries return no rows, so a provider on top of it sees an empty database:
//! the ledger is created, nothing is applied yet and every existence check is
//! false. Running a migration against it therefore yields the full script.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::traits::{Connection, Dialect};
use crate::core::value::Row;
use crate::error::Result;

/// Shared handle on the statements recorded by a [`ScriptConnection`].
#[derive(Debug, Clone, Default)]
pub struct ScriptBuffer {
    statements: Arc<Mutex<Vec<String>>>,
}

impl ScriptBuffer {
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.statements.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, sql: impl Into<String>) {
        self.lock().push(sql.into());
    }

    /// Recorded statements, in execution order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Render the recorded statements as one script.
    ///
    /// With a batch separator other than `;` (e.g. `GO`, `/`) every statement
    /// is followed by the separator on its own line; otherwise each statement
    /// is terminated with `;`.
    pub fn render(&self, separator: Option<&str>) -> String {
        let mut script = String::new();
        for statement in self.lock().iter() {
            let statement = statement.trim_end().trim_end_matches(';');
            match separator.filter(|s| *s != ";") {
                Some(sep) => {
                    script.push_str(statement);
                    script.push('\n');
                    script.push_str(sep);
                    script.push('\n');
                }
                None => {
                    script.push_str(statement);
                    script.push_str(";\n");
                }
            }
        }
        script
    }
}

/// Connection that appends every statement to a [`ScriptBuffer`].
#[derive(Debug)]
pub struct ScriptConnection {
    buffer: ScriptBuffer,
    begin_sql: Option<String>,
}

impl Default for ScriptConnection {
    fn default() -> Self {
        Self {
            buffer: ScriptBuffer::default(),
            begin_sql: Some("BEGIN".to_string()),
        }
    }
}

impl ScriptConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record transaction starts the way `dialect` writes them.
    pub fn for_dialect(dialect: &dyn Dialect) -> Self {
        Self {
            buffer: ScriptBuffer::default(),
            begin_sql: dialect.begin_transaction_sql().map(str::to_string),
        }
    }

    /// Handle that stays readable after the connection is moved into a provider.
    pub fn buffer(&self) -> ScriptBuffer {
        self.buffer.clone()
    }
}

#[async_trait]
impl Connection for ScriptConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.buffer.push(sql);
        Ok(0)
    }

    async fn query(&mut self, _sql: &str) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn begin(&mut self) -> Result<()> {
        if let Some(sql) = &self.begin_sql {
            self.buffer.push(sql.as_str());
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.buffer.push("COMMIT");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.buffer.push("ROLLBACK");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
