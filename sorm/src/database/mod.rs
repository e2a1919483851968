//!
//! The driver seam.
//!
//! Everything dialect specific lives behind these traits: placeholder
//! style, how the last inserted id is obtained and whether a bulk insert
//! strategy exists.
//!

use async_trait::async_trait;

use crate::config::Config;
use crate::value::Value;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Driver: Send + Sync + 'static {
    async fn connect(&self, config: &Config) -> Result<Box<dyn Connection>, DriverError>;
}

#[async_trait]
pub trait Connection: Send {
    async fn execute(&mut self, sql: &str, binds: &[Value]) -> Result<Box<dyn Cursor>, DriverError>;

    /// Id generated by the last insert into `table`, if the driver can tell.
    async fn last_insert_id(&mut self, table: &str, pk: &str) -> Result<Option<Value>, DriverError>;

    /// Insert many rows at once. `None` means the driver has no bulk strategy.
    async fn bulk_insert(
        &mut self,
        _table: &str,
        _columns: &[String],
        _rows: &[Vec<Value>],
    ) -> Result<Option<u64>, DriverError> {
        Ok(None)
    }
}

/// Forward-only source of raw rows.
#[async_trait]
pub trait Cursor: Send {
    /// Column names as reported by the driver.
    fn columns(&self) -> &[String];

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError>;

    /// Release driver resources. Calling it again does nothing.
    fn close(&mut self);
}

/// A cursor over rows that were read eagerly.
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Vec<Value>>,
    closed: bool,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            closed: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

#[async_trait]
impl Cursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}

/// Render a multi-row `INSERT` with `?` placeholders.
pub(crate) fn bulk_insert_sql(table: &str, columns: &[String], rows: &[Vec<Value>]) -> (String, Vec<Value>) {
    let mut builder = crate::builder::SqlBuilder::new();
    builder.push("INSERT INTO ");
    builder.push(table);
    builder.push(" (");
    builder.push_list(columns, ", ");
    builder.push(") VALUES ");
    for (index, row) in rows.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.push("(");
        builder.push_binds(row.iter().cloned());
        builder.push(")");
    }
    let rendered = builder.build();
    (rendered.sql, rendered.binds)
}
