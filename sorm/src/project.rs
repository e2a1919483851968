//!
//! Typed projection of rows.
//!
//! `#[derive(FromRow)]` implements [`FromRow`] by reading each field with
//! [`Row::try_get`]. A field can be mapped to another column name with
//! `#[sorm(column = "...")]`.
//!

use std::collections::BTreeMap;

use crate::row::Row;
use crate::value::Value;
use crate::SormResult;

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> SormResult<Self>;
}

impl FromRow for BTreeMap<String, Value> {
    fn from_row(row: &Row) -> SormResult<Self> {
        Ok(row.get_columns())
    }
}
