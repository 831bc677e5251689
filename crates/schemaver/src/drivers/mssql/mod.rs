//! Microsoft SQL Server driver.
//!
//! Only the [`MssqlDialect`] ships here. There is no bundled client, so
//! connecting to SQL Server is reported as unsupported; the dialect still
//! renders offline scripts through [`ScriptConnection`].
//!
//! [`ScriptConnection`]: crate::drivers::ScriptConnection

mod dialect;

pub use dialect::MssqlDialect;
