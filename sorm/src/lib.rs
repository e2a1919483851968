//!
//! A small row-mapping layer on top of a SQL driver.
//!
//! ```text
//!  Session ── search/insert/update/delete ──▶ Fragment ── render ──▶ (sql, binds)
//!     ▲                                                                  │
//!     │                                                 Driver::execute  ▼
//!    Row ◀──── Rows (materializer, shape cache) ◀──────────────────── Cursor
//! ```
//!
//! Tables are declared in a [`Schema`], which also carries inflate/deflate
//! transforms and trigger hooks. Everything else is reached through a
//! [`Session`].
//!

pub use sorm_macros::*;

pub mod builder;
pub mod config;
pub mod crud;
pub mod database;
pub mod predicate;
pub mod prelude;
pub mod profile;
pub mod project;
pub mod query;
pub mod row;
pub mod rows;
pub mod schema;
pub mod value;

mod engine;
mod shape;

#[cfg(test)]
mod testing;

pub use builder::Rendered;
pub use config::Config;
pub use crud::SearchOptions;
pub use database::{Connection, Cursor, Driver, DriverError};
pub use engine::{Session, SessionBuilder};
pub use predicate::{Conditions, Operand, Predicate};
pub use profile::{Profiler, QueryLog};
pub use project::FromRow;
pub use query::{Direction, Fragment, JoinKind, OrderSpec};
pub use row::Row;
pub use rows::Rows;
pub use schema::{Codec, Schema, TableSchema, Trigger, TriggerArgs};
pub use value::{FromValue, Record, Value};

#[derive(thiserror::Error, Debug)]
pub enum SormError {
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Statement failed: {sql}")]
    Statement {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Could not connect: {0}")]
    Connect(#[source] DriverError),

    #[error("No table context for row operation")]
    MissingTableContext,

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),

    #[error("Primary key {pk} of table {table} was not selected")]
    PrimaryKeyNotSelected { table: String, pk: String },

    /// The row was written, but could not be read back.
    #[error("Inserted into {table}, but could not retrieve the row: {reason}")]
    InsertRetrieval {
        table: String,
        reason: String,
        #[source]
        source: Option<Box<SormError>>,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("No accessor named {0}")]
    NoSuchAccessor(String),

    #[error("Conversion error: expected {expected}, found {found}")]
    Conversion {
        expected: &'static str,
        found: String,
    },
}

pub type SormResult<T> = Result<T, SormError>;
