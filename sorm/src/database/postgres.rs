use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column, Connection as _, Row as _, TypeInfo};

use super::{BufferedCursor, Connection, Cursor, Driver, DriverError};
use crate::config::Config;
use crate::value::Value;
use crate::SormError;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// PostgreSQL through `sqlx`.
///
/// `?` placeholders are rewritten to `$1, $2, ...`. A null bind is sent as a
/// nullable `TEXT`, so comparing null against a non-text column needs an
/// explicit cast in raw SQL.
#[derive(Clone, Debug, Default)]
pub struct Postgres;

#[async_trait]
impl Driver for Postgres {
    async fn connect(&self, config: &Config) -> Result<Box<dyn Connection>, DriverError> {
        let conn = PgConnection::connect(&config.dsn_with_credentials()).await?;
        Ok(Box::new(PgConn { conn }))
    }
}

pub struct PgConn {
    conn: PgConnection,
}

#[async_trait]
impl Connection for PgConn {
    async fn execute(&mut self, sql: &str, binds: &[Value]) -> Result<Box<dyn Cursor>, DriverError> {
        let sql = numbered_placeholders(sql);
        let query = binds.iter().fold(sqlx::query(&sql), bind);

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

    async fn last_insert_id(&mut self, table: &str, pk: &str) -> Result<Option<Value>, DriverError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT currval(pg_get_serial_sequence($1, $2))")
            .bind(table)
            .bind(pk)
            .fetch_one(&mut self.conn)
            .await?;

        Ok(id.map(Value::Int))
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
        let sql = numbered_placeholders(&sql);
        let result = binds
            .iter()
            .fold(sqlx::query(&sql), bind)
            .execute(&mut self.conn)
            .await?;

        Ok(Some(result.rows_affected()))
    }
}

fn bind<'q>(query: PgQuery<'q>, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(x) => query.bind(*x),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(bytes) => query.bind(bytes.clone()),
    }
}

/// How a column type is read off the binary wire format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ColumnKind {
    Void,
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Bytes,
    Text,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Numeric,
    Json,
}

impl ColumnKind {
    fn of(type_name: &str) -> Option<Self> {
        Some(match type_name {
            "VOID" => ColumnKind::Void,
            "BOOL" => ColumnKind::Bool,
            "INT2" => ColumnKind::Int2,
            "INT4" => ColumnKind::Int4,
            "INT8" => ColumnKind::Int8,
            "FLOAT4" => ColumnKind::Float4,
            "FLOAT8" => ColumnKind::Float8,
            "BYTEA" => ColumnKind::Bytes,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => ColumnKind::Text,
            "UUID" => ColumnKind::Uuid,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            "NUMERIC" => ColumnKind::Numeric,
            "JSON" | "JSONB" => ColumnKind::Json,
            _ => return None,
        })
    }
}

/// Temporal, uuid, numeric and json values come back as text.
fn decode_row(row: &PgRow) -> Result<Vec<Value>, DriverError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| -> Result<Value, DriverError> {
            let type_name = column.type_info().name();
            let kind = ColumnKind::of(type_name).ok_or_else(|| SormError::Conversion {
                expected: "a supported column type",
                found: format!("{} in column {}", type_name, column.name()),
            })?;

            Ok(decode_value(row, index, kind)?)
        })
        .collect()
}

fn decode_value(row: &PgRow, index: usize, kind: ColumnKind) -> Result<Value, sqlx::Error> {
    fn text<T: ToString>(value: Option<T>) -> Value {
        Value::from(value.map(|value| value.to_string()))
    }

    Ok(match kind {
        ColumnKind::Void => Value::Null,
        ColumnKind::Bool => Value::from(row.try_get::<Option<bool>, _>(index)?),
        ColumnKind::Int2 => Value::from(row.try_get::<Option<i16>, _>(index)?),
        ColumnKind::Int4 => Value::from(row.try_get::<Option<i32>, _>(index)?),
        ColumnKind::Int8 => Value::from(row.try_get::<Option<i64>, _>(index)?),
        ColumnKind::Float4 => Value::from(row.try_get::<Option<f32>, _>(index)?),
        ColumnKind::Float8 => Value::from(row.try_get::<Option<f64>, _>(index)?),
        ColumnKind::Bytes => Value::from(row.try_get::<Option<Vec<u8>>, _>(index)?),
        ColumnKind::Text => Value::from(row.try_get::<Option<String>, _>(index)?),
        ColumnKind::Uuid => text(row.try_get::<Option<Uuid>, _>(index)?),
        ColumnKind::Timestamp => text(row.try_get::<Option<NaiveDateTime>, _>(index)?),
        ColumnKind::TimestampTz => Value::from(
            row.try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(|at| at.to_rfc3339()),
        ),
        ColumnKind::Date => text(row.try_get::<Option<NaiveDate>, _>(index)?),
        ColumnKind::Time => text(row.try_get::<Option<NaiveTime>, _>(index)?),
        ColumnKind::Numeric => text(row.try_get::<Option<Decimal>, _>(index)?),
        ColumnKind::Json => text(row.try_get::<Option<JsonValue>, _>(index)?),
    })
}

/// Rewrite `?` to `$n`, leaving quoted literals and identifiers alone.
fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;

    for ch in sql.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'') | (None, '"') => {
                quote = Some(ch);
                out.push(ch);
            }
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            (None, c) => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_kinds() {
        assert_eq!(ColumnKind::of("TIMESTAMPTZ"), Some(ColumnKind::TimestampTz));
        assert_eq!(ColumnKind::of("JSONB"), Some(ColumnKind::Json));
        assert_eq!(ColumnKind::of("NUMERIC"), Some(ColumnKind::Numeric));
        assert_eq!(ColumnKind::of("VARCHAR"), Some(ColumnKind::Text));
        assert_eq!(ColumnKind::of("INET"), None);
    }

    #[test]
    fn rewrites_placeholders_outside_literals() {
        assert_eq!(
            numbered_placeholders("SELECT * FROM t WHERE a = ? AND b = '?' AND c IN (?, ?)"),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND c IN ($2, $3)"
        );
    }
}
