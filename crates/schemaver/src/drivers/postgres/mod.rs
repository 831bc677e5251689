//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresConnection`]: tokio-postgres session
//! - [`SslMode`]: TLS policy for the session

mod connection;
mod dialect;
mod tls;

pub use connection::PostgresConnection;
pub use dialect::PostgresDialect;
pub use tls::SslMode;
