use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection as _, Row as _, TypeInfo, ValueRef};

use super::{BufferedCursor, Connection, Cursor, Driver, DriverError};
use crate::config::Config;
use crate::value::Value;

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

/// SQLite through `sqlx`. `Config::dsn` is a `sqlite:` url,
/// e.g. `sqlite::memory:`.
#[derive(Clone, Debug, Default)]
pub struct Sqlite;

#[async_trait]
impl Driver for Sqlite {
    async fn connect(&self, config: &Config) -> Result<Box<dyn Connection>, DriverError> {
        let conn = SqliteConnection::connect(&config.dsn).await?;
        Ok(Box::new(SqliteConn { conn }))
    }
}

pub struct SqliteConn {
    conn: SqliteConnection,
}

#[async_trait]
impl Connection for SqliteConn {
    async fn execute(&mut self, sql: &str, binds: &[Value]) -> Result<Box<dyn Cursor>, DriverError> {
        let query = binds.iter().fold(sqlx::query(sql), bind);

        let mut columns = Vec::new();
        let mut rows = Vec::new();
        {
            let mut stream = query.fetch(&mut self.conn);
            while let Some(row) = stream.try_next().await? {
                if columns.is_empty() {
                    columns = row
                        .columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect();
                }
                rows.push(decode_row(&row)?);
            }
        }

        Ok(Box::new(BufferedCursor::new(columns, rows)))
    }

    async fn last_insert_id(&mut self, _table: &str, _pk: &str) -> Result<Option<Value>, DriverError> {
        let id: i64 = sqlx::query_scalar("SELECT last_insert_rowid()")
            .fetch_one(&mut self.conn)
            .await?;

        // 0 means nothing was inserted on this connection.
        Ok(if id == 0 { None } else { Some(Value::Int(id)) })
    }

    async fn bulk_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<Option<u64>, DriverError> {
        if rows.is_empty() {
            return Ok(Some(0));
        }

        let (sql, binds) = super::bulk_insert_sql(table, columns, rows);
        let result = binds
            .iter()
            .fold(sqlx::query(&sql), bind)
            .execute(&mut self.conn)
            .await?;

        Ok(Some(result.rows_affected()))
    }
}

fn bind<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(x) => query.bind(*x),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(bytes) => query.bind(bytes.clone()),
    }
}

fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, sqlx::Error> {
    (0..row.len())
        .map(|index| {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                return Ok(Value::Null);
            }

            // The storage class of the value itself, not the declared type.
            let storage = raw.type_info().name().to_string();
            Ok(match storage.as_str() {
                "INTEGER" | "BOOLEAN" => Value::Int(row.try_get_unchecked(index)?),
                "REAL" => Value::Float(row.try_get_unchecked(index)?),
                "BLOB" => Value::Bytes(row.try_get_unchecked(index)?),
                _ => Value::Text(row.try_get_unchecked(index)?),
            })
        })
        .collect()
}
