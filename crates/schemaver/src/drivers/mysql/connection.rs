//! MySQL connection over mysql_async.

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Value};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::core::traits::Connection;
use crate::core::value::Row;
use crate::error::{MigrateError, Result};

/// One mysql_async session.
pub struct MysqlConnection {
    conn: Option<Conn>,
}

impl MysqlConnection {
    /// Open a session using the configured host fields or connection URL.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let opts: Opts = match &config.connection_string {
            Some(url) => Opts::from_url(url)
                .map_err(|e| MigrateError::connection("parsing MySQL connection URL", e))?,
            None => OptsBuilder::default()
                .ip_or_hostname(config.host.clone())
                .tcp_port(config.port_or_default()?)
                .user(Some(config.user.clone()))
                .pass(Some(config.password.clone()))
                .db_name(Some(config.database.clone()))
                .into(),
        };

        let conn = Conn::new(opts)
            .await
            .map_err(|e| MigrateError::connection("connecting to MySQL", e))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host,
            config.port_or_default()?,
            config.database
        );

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self, sql: &str) -> Result<&mut Conn> {
        self.conn.as_mut().ok_or_else(|| {
            MigrateError::sql(
                sql,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "connection is closed"),
            )
        })
    }

    async fn run(&mut self, sql: &str) -> Result<()> {
        self.conn(sql)?
            .query_drop(sql)
            .await
            .map_err(|e| MigrateError::sql(sql, e))
    }
}

/// Render a wire value as text; NULL becomes `None`.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        other => Some(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

#[async_trait]
impl Connection for MysqlConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let conn = self.conn(sql)?;
        conn.query_drop(sql)
            .await
            .map_err(|e| MigrateError::sql(sql, e))?;
        Ok(conn.affected_rows())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let rows: Vec<mysql_async::Row> = self
            .conn(sql)?
            .query(sql)
            .await
            .map_err(|e| MigrateError::sql(sql, e))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                Row::new(
                    row.unwrap_raw()
                        .into_iter()
                        .map(|cell| cell.and_then(value_to_text))
                        .collect(),
                )
            })
            .collect())
    }

    async fn begin(&mut self) -> Result<()> {
        self.run("START TRANSACTION").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.run("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect()
                .await
                .map_err(|e| MigrateError::connection("closing MySQL connection", e))?;
        }
        Ok(())
    }
}
