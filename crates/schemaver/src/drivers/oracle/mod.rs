//! Oracle driver.
//!
//! Only the dialect is provided; run its output through the `script`
//! command or any [`Connection`](crate::core::traits::Connection).

mod dialect;

pub use dialect::OracleDialect;
