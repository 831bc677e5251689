//! PostgreSQL connection over tokio-postgres.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_postgres::{Client, Config as PgConfig, NoTls, SimpleQueryMessage, Socket};
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::core::traits::Connection;
use crate::core::value::Row;
use crate::error::{MigrateError, Result};

use super::tls::{self, SslMode};

/// Connect timeout for the initial handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One tokio-postgres session.
///
/// Statements go through the simple query protocol so every cell comes back
/// as text and multi-statement scripts are accepted.
pub struct PostgresConnection {
    client: Option<Client>,
}

impl PostgresConnection {
    /// Open a session using the configured host fields or connection string.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pg_config = match &config.connection_string {
            Some(conn_str) => conn_str.parse::<PgConfig>().map_err(|e| {
                MigrateError::connection("parsing PostgreSQL connection string", e)
            })?,
            None => {
                let mut pg_config = PgConfig::new();
                pg_config.host(&config.host);
                pg_config.port(config.port_or_default()?);
                pg_config.dbname(&config.database);
                pg_config.user(&config.user);
                pg_config.password(&config.password);
                pg_config.keepalives(true);
                pg_config.connect_timeout(CONNECT_TIMEOUT);
                pg_config
            }
        };

        let ssl_mode = config.ssl_mode.parse::<SslMode>()?;
        let client = match tls::connector(ssl_mode)? {
            Some(tls) => spawn_session(pg_config.connect(tls).await)?,
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                spawn_session(pg_config.connect(NoTls).await)?
            }
        };

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host,
            config.port_or_default()?,
            config.database
        );

        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self, sql: &str) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| {
            MigrateError::sql(
                sql,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "connection is closed"),
            )
        })
    }

    async fn batch(&mut self, sql: &str) -> Result<()> {
        self.client(sql)?
            .batch_execute(sql)
            .await
            .map_err(|e| MigrateError::sql(sql, e))
    }
}

/// Drive the connection half on its own task and hand back the client.
fn spawn_session<T>(
    result: std::result::Result<(Client, tokio_postgres::Connection<Socket, T>), tokio_postgres::Error>,
) -> Result<Client>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (client, connection) =
        result.map_err(|e| MigrateError::connection("connecting to PostgreSQL", e))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {}", e);
        }
    });
    Ok(client)
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let messages = self
            .client(sql)?
            .simple_query(sql)
            .await
            .map_err(|e| MigrateError::sql(sql, e))?;
        Ok(messages
            .iter()
            .map(|m| match m {
                SimpleQueryMessage::CommandComplete(n) => *n,
                _ => 0,
            })
            .sum())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let messages = self
            .client(sql)?
            .simple_query(sql)
            .await
            .map_err(|e| MigrateError::sql(sql, e))?;
        Ok(messages
            .into_iter()
            .filter_map(|m| match m {
                SimpleQueryMessage::Row(row) => Some(Row::new(
                    (0..row.len()).map(|i| row.get(i).map(str::to_string)).collect(),
                )),
                _ => None,
            })
            .collect())
    }

    async fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the client ends the spawned connection task.
        self.client.take();
        Ok(())
    }
}
