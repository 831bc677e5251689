//! Recording connection for unit tests.
//!
//! [`MockConnection`] logs every statement and transaction boundary, answers
//! scripted queries, and keeps just enough state to behave like a real ledger:
//! created tables report as existing, ledger inserts and deletes are applied,
//! and a rollback restores the state saved at `BEGIN`.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::traits::Connection;
use crate::core::value::Row;
use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    tables: HashSet<String>,
    ledger: BTreeSet<(String, i64)>,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<String>,
    executed: Vec<String>,
    responses: Vec<(String, Vec<Row>)>,
    fail_on: Vec<String>,
    fail_commit: bool,
    fail_rollback: bool,
    delay: Option<Duration>,
    closed: bool,
    data: Snapshot,
    saved: Option<Snapshot>,
}

/// Cloneable handle; clones share state with the connection under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<State>>,
}

fn injected(sql: &str) -> MigrateError {
    MigrateError::sql(sql, std::io::Error::other("injected failure"))
}

/// Single-quoted literals in `sql`, with doubled quotes collapsed.
fn literals(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut literal = String::new();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    literal.push('\'');
                } else {
                    break;
                }
            } else {
                literal.push(c);
            }
        }
        out.push(literal);
    }
    out
}

/// Bare table name from `CREATE TABLE <name> (...)`.
fn created_table(sql: &str) -> Option<String> {
    let rest = sql.strip_prefix("CREATE TABLE ")?;
    let qualified = rest.split(" (").next()?;
    let name = qualified.rsplit('.').next()?;
    Some(name.trim_matches(|c| matches!(c, '"' | '[' | ']' | '`')).to_string())
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Statements passed to `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Statements, queries and transaction boundaries, in order. Queries are
    /// prefixed with `query: `.
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn transaction_events(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
            .cloned()
            .collect()
    }

    /// Answer queries containing `pattern` with `rows`. Earlier patterns win.
    pub fn respond(&self, pattern: &str, rows: Vec<Row>) {
        self.lock().responses.push((pattern.to_string(), rows));
    }

    /// Fail every statement or query containing `pattern`.
    pub fn fail_on(&self, pattern: &str) {
        self.lock().fail_on.push(pattern.to_string());
    }

    pub fn fail_commit(&self, fail: bool) {
        self.lock().fail_commit = fail;
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.lock().fail_rollback = fail;
    }

    /// Sleep this long before answering each call.
    pub fn delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Pretend the default ledger table already exists.
    pub fn set_ledger_exists(&self, exists: bool) {
        let mut state = self.lock();
        if exists {
            state.data.tables.insert("SchemaInfo".to_string());
        } else {
            state.data.tables.remove("SchemaInfo");
        }
    }

    /// Seed the ledger with applied versions.
    pub fn seed_applied(&self, key: &str, versions: &[i64]) {
        let mut state = self.lock();
        state.data.tables.insert("SchemaInfo".to_string());
        for version in versions {
            state.data.ledger.insert((key.to_string(), *version));
        }
    }

    /// Ledger contents for `key`, ascending.
    pub fn applied(&self, key: &str) -> Vec<i64> {
        self.lock()
            .data
            .ledger
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| *v)
            .collect()
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, sql: &str) -> Result<()> {
        let state = self.lock();
        if state.closed {
            return Err(MigrateError::sql(
                sql,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "connection is closed"),
            ));
        }
        if state.fail_on.iter().any(|p| sql.contains(p.as_str())) {
            return Err(injected(sql));
        }
        Ok(())
    }
}

impl State {
    fn apply_statement(&mut self, sql: &str) {
        if let Some(table) = created_table(sql) {
            self.data.tables.insert(table);
        } else if sql.starts_with("INSERT INTO") && sql.contains("AssemblyKey") {
            let values = sql.split(" VALUES ").nth(1).unwrap_or("");
            if let [version, key] = literals(values).as_slice() {
                if let Ok(version) = version.parse() {
                    self.data.ledger.insert((key.clone(), version));
                }
            }
        } else if sql.starts_with("DELETE FROM") && sql.contains("AssemblyKey") {
            let where_sql = sql.split(" WHERE ").nth(1).unwrap_or("");
            let version = where_sql
                .split("= ")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|v| v.parse::<i64>().ok());
            let key = literals(where_sql).into_iter().next().unwrap_or_default();
            if let Some(version) = version {
                self.data.ledger.remove(&(key, version));
            }
        }
    }

    fn answer(&self, sql: &str) -> Vec<Row> {
        if let Some((_, rows)) = self
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return rows.clone();
        }

        if sql.contains("COUNT(*)") {
            let found = literals(sql)
                .iter()
                .any(|literal| self.data.tables.contains(literal));
            return vec![Row::new(vec![Some(if found { "1" } else { "0" }.to_string())])];
        }

        if sql.contains("AssemblyKey") {
            let key = literals(sql).pop().unwrap_or_default();
            return self
                .data
                .ledger
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| Row::new(vec![Some(v.to_string())]))
                .collect();
        }

        Vec::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.pause().await;
        {
            let mut state = self.lock();
            state.events.push(sql.to_string());
        }
        self.check(sql)?;
        let mut state = self.lock();
        state.executed.push(sql.to_string());
        state.apply_statement(sql);
        Ok(1)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.pause().await;
        self.lock().events.push(format!("query: {}", sql));
        self.check(sql)?;
        Ok(self.lock().answer(sql))
    }

    async fn begin(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.events.push("BEGIN".to_string());
        state.saved = Some(state.data.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.events.push("COMMIT".to_string());
        if state.fail_commit {
            return Err(injected("COMMIT"));
        }
        state.saved = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.events.push("ROLLBACK".to_string());
        if state.fail_rollback {
            return Err(injected("ROLLBACK"));
        }
        if let Some(saved) = state.saved.take() {
            state.data = saved;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(literals("a = 'x' AND b = 'it''s'"), vec!["x", "it's"]);
        assert!(literals("SELECT 1").is_empty());
    }

    #[test]
    fn test_created_table() {
        assert_eq!(
            created_table("CREATE TABLE [dbo].[SchemaInfo] ([Version] BIGINT)").as_deref(),
            Some("SchemaInfo")
        );
        assert_eq!(created_table("DROP TABLE t"), None);
    }

    #[tokio::test]
    async fn test_rollback_restores_ledger() {
        let mut conn = MockConnection::new();
        conn.seed_applied("", &[1]);
        conn.begin().await.unwrap();
        conn.execute("INSERT INTO \"SchemaInfo\" (\"Version\", \"AssemblyKey\") VALUES ('2', '')")
            .await
            .unwrap();
        assert_eq!(conn.applied(""), vec![1, 2]);
        conn.rollback().await.unwrap();
        assert_eq!(conn.applied(""), vec![1]);
    }
}
