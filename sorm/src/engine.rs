use std::sync::Arc;

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::builder::Rendered;
use crate::config::Config;
use crate::database::{Connection, Cursor, Driver};
use crate::profile::{Profiler, QueryLog};
use crate::rows::Rows;
use crate::schema::Schema;
use crate::shape::ShapeCache;
use crate::value::Value;
use crate::{SormError, SormResult};

/// A database session: one lazily opened connection, the schema, and the
/// per-session shape cache.
///
/// Cloning is cheap, clones share the same connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    driver: Arc<dyn Driver>,
    config: Config,
    schema: Arc<Schema>,
    conn: Mutex<Option<Box<dyn Connection>>>,
    profiler: Option<Arc<dyn Profiler>>,
    query_log: Option<Arc<QueryLog>>,
    shapes: ShapeCache,
}

pub struct SessionBuilder {
    driver: Arc<dyn Driver>,
    config: Config,
    schema: Schema,
    profiler: Option<Arc<dyn Profiler>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Use a custom profiler instead of the built-in [`QueryLog`].
    pub fn profiler(mut self, profiler: Arc<dyn Profiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    pub fn build(self) -> Session {
        let (profiler, query_log) = match self.profiler {
            Some(profiler) => (Some(profiler), None),
            None if self.config.profile => {
                let log = Arc::new(QueryLog::new());
                (Some(log.clone() as Arc<dyn Profiler>), Some(log))
            }
            None => (None, None),
        };

        Session {
            inner: Arc::new(Inner {
                driver: self.driver,
                config: self.config,
                schema: Arc::new(self.schema),
                conn: Mutex::new(None),
                profiler,
                query_log,
                shapes: ShapeCache::default(),
            }),
        }
    }
}

impl Session {
    pub fn builder(driver: impl Driver) -> SessionBuilder {
        SessionBuilder {
            driver: Arc::new(driver),
            config: Config::default(),
            schema: Schema::new(),
            profiler: None,
        }
    }

    pub fn new(driver: impl Driver, config: Config, schema: Schema) -> Self {
        Self::builder(driver).config(config).schema(schema).build()
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The statement log, when profiling was switched on through [`Config`].
    pub fn query_log(&self) -> Option<Arc<QueryLog>> {
        self.inner.query_log.clone()
    }

    pub(crate) fn shapes(&self) -> &ShapeCache {
        &self.inner.shapes
    }

    /// Drop the connection. The next statement opens a new one.
    pub async fn disconnect(&self) {
        let mut conn = self.inner.conn.lock().await;
        if conn.take().is_some() {
            tracing::debug!("database connection dropped");
        }
    }

    /// Run one statement and hand back its cursor.
    pub async fn execute(&self, sql: &str, binds: &[Value]) -> SormResult<Box<dyn Cursor>> {
        let mut conn = self.connection().await?;
        self.profile(sql);
        tracing::debug!(sql, binds = binds.len(), "executing statement");

        conn.execute(sql, binds)
            .await
            .map_err(|source| SormError::Statement {
                sql: sql.to_string(),
                source,
            })
    }

    pub(crate) async fn materialize(
        &self,
        rendered: Rendered,
        select: Vec<String>,
        table: Option<String>,
    ) -> SormResult<Rows> {
        let cursor = self.execute(&rendered.sql, &rendered.binds).await?;
        Ok(Rows::new(self.clone(), cursor, rendered.sql, select, table))
    }

    pub(crate) async fn last_insert_id(&self, table: &str, pk: &str) -> SormResult<Option<Value>> {
        let mut conn = self.connection().await?;
        conn.last_insert_id(table, pk)
            .await
            .map_err(|source| SormError::Statement {
                sql: format!("<last insert id of {}>", table),
                source,
            })
    }

    pub(crate) async fn bulk_insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> SormResult<Option<u64>> {
        let mut conn = self.connection().await?;
        tracing::debug!(table, rows = rows.len(), "bulk insert");
        conn.bulk_insert(table, columns, rows)
            .await
            .map_err(|source| SormError::Statement {
                sql: format!("<bulk insert into {}>", table),
                source,
            })
    }

    async fn connection(&self) -> SormResult<MappedMutexGuard<'_, Box<dyn Connection>>> {
        let mut guard = self.inner.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        MutexGuard::try_map(guard, |conn| conn.as_mut())
            .map_err(|_| SormError::Connect("connection went away".into()))
    }

    async fn connect(&self) -> SormResult<Box<dyn Connection>> {
        tracing::debug!("opening database connection");
        let mut conn = self
            .inner
            .driver
            .connect(&self.inner.config)
            .await
            .map_err(SormError::Connect)?;

        for sql in &self.inner.config.on_connect_do {
            self.profile(sql);
            let mut cursor = conn
                .execute(sql, &[])
                .await
                .map_err(|source| SormError::Statement {
                    sql: sql.clone(),
                    source,
                })?;
            cursor.close();
        }

        Ok(conn)
    }

    fn profile(&self, sql: &str) {
        if let Some(profiler) = &self.inner.profiler {
            if let Err(err) = profiler.record_query(sql) {
                tracing::warn!(error = %err, "profiler failed to record query");
            }
        }
    }
}
