//!
//! Materialized rows.
//!
//! A [`Row`] is a snapshot of one result row. Columns are read through
//! accessors (`get`), which are derived once per distinct select shape, or
//! through the generic `get_column`. Both inflate the stored value.
//!
//! A row that knows its table and carries the table's primary key can be
//! updated and deleted in place.
//!

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::predicate::Conditions;
use crate::project::FromRow;
use crate::shape::{base_name, qualifier, Shape};
use crate::value::{FromValue, Record, Value};
use crate::{Session, SormError, SormResult};

#[derive(Clone)]
pub struct Row {
    session: Session,
    data: HashMap<String, Value>,
    shape: Arc<Shape>,
    table: Option<String>,
}

impl Row {
    pub(crate) fn new(
        session: Session,
        data: HashMap<String, Value>,
        shape: Arc<Shape>,
        table: Option<String>,
    ) -> Self {
        Self {
            session,
            data,
            shape,
            table,
        }
    }

    /// Call the accessor `name`.
    ///
    /// Accessors exist for every selected column, named without any `table.`
    /// prefix, except where the name is taken by a method of `Row` itself.
    pub fn get(&self, name: &str) -> SormResult<Value> {
        let alias = self
            .shape
            .accessor(name)
            .ok_or_else(|| SormError::NoSuchAccessor(name.to_string()))?;
        Ok(self.get_column(alias).unwrap_or(Value::Null))
    }

    /// Inflated value of a column, by alias or by base name.
    ///
    /// Table transforms apply when the column is unqualified or qualified
    /// with the row's table. Columns of other tables only get schema rules.
    pub fn get_column(&self, name: &str) -> Option<Value> {
        let raw = self.raw(name)?.clone();
        let alias = self.alias_of(name);
        let table = match qualifier(alias) {
            Some(qualifier) if Some(qualifier) != self.table.as_deref() => None,
            _ => self.table.as_deref(),
        };
        Some(
            self.session
                .schema()
                .from_storage(table, base_name(alias), raw),
        )
    }

    /// Inflated values of every selected column, keyed by base name.
    pub fn get_columns(&self) -> BTreeMap<String, Value> {
        self.shape
            .columns()
            .iter()
            .map(|alias| {
                let value = self.get_column(alias).unwrap_or(Value::Null);
                (base_name(alias).to_string(), value)
            })
            .collect()
    }

    pub fn try_get<T: FromValue>(&self, name: &str) -> SormResult<T> {
        T::from_value(self.get_column(name).unwrap_or(Value::Null))
    }

    pub fn project<T: FromRow>(&self) -> SormResult<T> {
        T::from_row(self)
    }

    /// The row as read from the driver, nothing inflated.
    pub fn raw_columns(&self) -> &HashMap<String, Value> {
        &self.data
    }

    pub fn select_columns(&self) -> &[String] {
        self.shape.columns()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Write `changes` to this row's record and read it back.
    ///
    /// The table is `table`, or else the table the row was read from.
    pub async fn update(&self, changes: Record, table: Option<&str>) -> SormResult<Option<Row>> {
        let (table, conditions) = self.pk_condition(table)?;
        self.session.update(&table, changes, conditions).await
    }

    pub async fn delete(&self, table: Option<&str>) -> SormResult<()> {
        let (table, conditions) = self.pk_condition(table)?;
        self.session.delete(&table, conditions).await
    }

    /// The selected alias `name` refers to: itself, or the last alias with
    /// that base name.
    fn alias_of<'a>(&'a self, name: &'a str) -> &'a str {
        let columns = self.shape.columns();
        if columns.iter().any(|alias| alias == name) {
            return name;
        }
        columns
            .iter()
            .rev()
            .find(|alias| base_name(alias) == name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    fn raw(&self, name: &str) -> Option<&Value> {
        self.data
            .get(name)
            .or_else(|| self.data.get(self.alias_of(name)))
            .or_else(|| self.data.get(base_name(name)))
            .or_else(|| {
                // drivers that keep the qualifier, e.g. `user.id` for `id`
                self.data
                    .iter()
                    .find(|(column, _)| base_name(column) == name)
                    .map(|(_, value)| value)
            })
    }

    fn pk_condition(&self, table: Option<&str>) -> SormResult<(String, Conditions)> {
        let table = table
            .or(self.table.as_deref())
            .ok_or(SormError::MissingTableContext)?;

        let info = self
            .session
            .schema()
            .table_info(table)
            .ok_or_else(|| SormError::UnknownTable(table.to_string()))?;

        let pk = info
            .pk()
            .ok_or_else(|| SormError::NoPrimaryKey(table.to_string()))?;

        if !self.shape.contains_column(pk) {
            return Err(SormError::PrimaryKeyNotSelected {
                table: table.to_string(),
                pk: pk.to_string(),
            });
        }

        let id = self.raw(pk).cloned().unwrap_or(Value::Null);
        Ok((table.to_string(), Conditions::new().and(pk, id)))
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Row")
            .field("table", &self.table)
            .field("columns", &self.shape.columns())
            .field("data", &self.data)
            .finish()
    }
}
