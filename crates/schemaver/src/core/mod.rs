//! Core abstractions for database-agnostic schema migration.
//!
//! - [`schema`]: column, type and property model used to describe DDL
//! - [`value`]: text rows read back from queries and row values for DML
//! - [`identifier`]: identifier validation and quoting
//! - [`traits`]: the `Connection`, `Dialect` and `Migration` seams
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable SQL generation per engine
//! - **Template Method**: default `Dialect` methods define the ANSI skeleton
//!   that adapters override piecemeal

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{
    Column, ColumnProperty, ColumnType, DbType, DefaultValue, ForeignKeyAction, ObjectName,
};
pub use traits::{ColumnChange, Connection, Dialect, Migration};
pub use value::{Row, RowValues};
