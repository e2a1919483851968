//!
//! Materialization of cursor rows into [`Row`]s.
//!

use std::collections::HashMap;
use std::sync::Arc;

use crate::database::Cursor;
use crate::row::Row;
use crate::shape::Shape;
use crate::{Session, SormError, SormResult};

/// A lazy sequence of rows over one cursor.
///
/// Rows are pulled one at a time. Once the cursor runs dry it is closed and
/// `next` keeps returning `None`; reading again needs a new query.
pub struct Rows {
    session: Session,
    cursor: Option<Box<dyn Cursor>>,
    sql: String,
    select: Vec<String>,
    table: Option<String>,
    shape: Option<Arc<Shape>>,
}

impl Rows {
    pub(crate) fn new(
        session: Session,
        cursor: Box<dyn Cursor>,
        sql: String,
        select: Vec<String>,
        table: Option<String>,
    ) -> Self {
        Self {
            session,
            cursor: Some(cursor),
            sql,
            select,
            table,
            shape: None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    pub async fn next(&mut self) -> SormResult<Option<Row>> {
        let fetched = match self.cursor.as_mut() {
            Some(cursor) => cursor.next_row().await,
            None => return Ok(None),
        };

        let values = match fetched {
            Ok(Some(values)) => values,
            Ok(None) => {
                self.close();
                return Ok(None);
            }
            Err(source) => {
                self.close();
                return Err(SormError::Statement {
                    sql: self.sql.clone(),
                    source,
                });
            }
        };

        let driver_columns = self.driver_columns();
        let shape = self.shape(&driver_columns);
        let data: HashMap<String, crate::Value> = driver_columns.into_iter().zip(values).collect();

        Ok(Some(Row::new(
            self.session.clone(),
            data,
            shape,
            self.table.clone(),
        )))
    }

    /// The first row; the rest of the cursor is discarded.
    pub async fn first(mut self) -> SormResult<Option<Row>> {
        let row = self.next().await?;
        self.close();
        Ok(row)
    }

    pub async fn all(mut self) -> SormResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }

    /// Column names of the raw rows; the select list if the driver
    /// reports none.
    fn driver_columns(&self) -> Vec<String> {
        match &self.cursor {
            Some(cursor) if !cursor.columns().is_empty() => cursor.columns().to_vec(),
            _ => self.select.clone(),
        }
    }

    fn shape(&mut self, driver_columns: &[String]) -> Arc<Shape> {
        if let Some(shape) = &self.shape {
            return shape.clone();
        }

        let columns = if self.select.is_empty() {
            driver_columns
        } else {
            &self.select[..]
        };
        let shape = self.session.shapes().get_or_insert(columns);
        self.shape = Some(shape.clone());
        shape
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Rows")
            .field("sql", &self.sql)
            .field("select", &self.select)
            .field("table", &self.table)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        self.close();
    }
}
