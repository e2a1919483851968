//!
//! Table level operations on a [`Session`].
//!
//! Writes go through the schema: trigger hooks first, then deflate and
//! storage encoding per column. Inserts and updates read the row back.
//!

use std::collections::{BTreeSet, HashMap};

use crate::builder::{Rendered, SqlBuilder};
use crate::predicate::{Conditions, Predicate};
use crate::query::{render_where, Fragment, OrderSpec};
use crate::row::Row;
use crate::rows::Rows;
use crate::schema::{Trigger, TriggerArgs};
use crate::value::{Record, Value};
use crate::{Session, SormError, SormResult};

#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    /// Columns to select. Defaults to the table's declared columns.
    pub select: Option<Vec<String>>,
    pub order_by: Vec<OrderSpec>,
    pub group_by: Vec<String>,
    pub having: Conditions,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SearchOptions {
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn having(mut self, column: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        self.having.push(column, predicate);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl Session {
    /// An empty fragment bound to this session, for queries `search` can't express.
    pub fn resultset(&self) -> Fragment {
        Fragment::with_session(self.clone())
    }

    pub async fn search(
        &self,
        table: &str,
        conditions: Conditions,
        options: SearchOptions,
    ) -> SormResult<Rows> {
        let mut fragment = self.resultset();

        let declared = self
            .schema()
            .table_info(table)
            .map(|info| info.column_names().to_vec())
            .unwrap_or_default();
        for column in options.select.unwrap_or(declared) {
            fragment.add_select(column, None);
        }

        fragment.from([table]);
        for (column, predicate) in conditions.iter() {
            fragment.add_where(column, predicate.clone());
        }
        for (column, predicate) in options.having.iter() {
            fragment.add_having(column, predicate.clone());
        }
        if !options.group_by.is_empty() {
            fragment.group_by(options.group_by);
        }
        if !options.order_by.is_empty() {
            fragment.order(options.order_by);
        }
        if let Some(limit) = options.limit {
            fragment.limit(limit);
        }
        if let Some(offset) = options.offset {
            fragment.offset(offset);
        }

        fragment.retrieve(Some(table)).await
    }

    pub async fn single(
        &self,
        table: &str,
        conditions: Conditions,
        options: SearchOptions,
    ) -> SormResult<Option<Row>> {
        self.search(table, conditions, options.limit(1))
            .await?
            .first()
            .await
    }

    /// `SELECT COUNT(column) AS alias`; read the count with `row.get(alias)`.
    pub async fn count(
        &self,
        table: &str,
        (alias, column): (&str, &str),
        conditions: Conditions,
    ) -> SormResult<Option<Row>> {
        let mut fragment = self.resultset();
        fragment
            .add_select(format!("COUNT({})", column), Some(alias))
            .from([table]);
        for (column, predicate) in conditions.iter() {
            fragment.add_where(column, predicate.clone());
        }

        fragment.retrieve(Some(table)).await?.first().await
    }

    pub async fn insert(&self, table: &str, mut values: Record) -> SormResult<Row> {
        self.schema()
            .call_trigger(table, Trigger::PreInsert, &mut TriggerArgs::Values(&mut values));

        let stored = self.to_storage(table, values);

        let mut builder = SqlBuilder::new();
        builder.push("INSERT INTO ");
        builder.push(table);
        if stored.is_empty() {
            builder.push(" DEFAULT VALUES");
        } else {
            builder.push(" (");
            builder.push_list(stored.keys(), ", ");
            builder.push(") VALUES (");
            builder.push_binds(stored.values().cloned());
            builder.push(")");
        }
        self.run(builder.build()).await?;

        let row = self.retrieve_inserted(table, &stored).await?;
        self.schema()
            .call_trigger(table, Trigger::PostInsert, &mut TriggerArgs::Row(&row));

        Ok(row)
    }

    pub async fn create(&self, table: &str, values: Record) -> SormResult<Row> {
        self.insert(table, values).await
    }

    /// Insert many rows through the driver's bulk strategy. No hooks are run.
    pub async fn bulk_insert(&self, table: &str, rows: Vec<Record>) -> SormResult<u64> {
        let columns: Vec<String> = rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let values: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = row.remove(column).unwrap_or(Value::Null);
                        self.schema().to_storage(table, column, value)
                    })
                    .collect()
            })
            .collect();

        self.bulk_insert_rows(table, &columns, &values)
            .await?
            .ok_or_else(|| {
                SormError::UnsupportedOperation(format!("bulk insert into {}", table))
            })
    }

    /// Update the rows matching `conditions` and read the first one back
    /// with the same conditions.
    pub async fn update(
        &self,
        table: &str,
        mut values: Record,
        conditions: Conditions,
    ) -> SormResult<Option<Row>> {
        self.schema()
            .call_trigger(table, Trigger::PreUpdate, &mut TriggerArgs::Values(&mut values));

        if values.is_empty() {
            return Err(SormError::MalformedQuery(format!(
                "update of {} without values",
                table
            )));
        }

        let stored = self.to_storage(table, values);

        let mut builder = SqlBuilder::new();
        builder.push("UPDATE ");
        builder.push(table);
        builder.push(" SET ");
        for (index, (column, value)) in stored.into_iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(&column);
            builder.push(" = ");
            builder.push_bind(value);
        }
        append_where(&mut builder, &conditions)?;
        self.run(builder.build()).await?;

        let row = self
            .single(table, conditions, SearchOptions::default())
            .await?;
        if let Some(row) = &row {
            self.schema()
                .call_trigger(table, Trigger::PostUpdate, &mut TriggerArgs::Row(row));
        }

        Ok(row)
    }

    /// Delete the rows matching `conditions`. Matching nothing is fine.
    pub async fn delete(&self, table: &str, conditions: Conditions) -> SormResult<()> {
        self.schema()
            .call_trigger(table, Trigger::PreDelete, &mut TriggerArgs::Where(&conditions));

        let mut builder = SqlBuilder::new();
        builder.push("DELETE FROM ");
        builder.push(table);
        append_where(&mut builder, &conditions)?;
        self.run(builder.build()).await?;

        self.schema()
            .call_trigger(table, Trigger::PostDelete, &mut TriggerArgs::Table);

        Ok(())
    }

    /// Return the row equal to `values` in every column, or insert `values`.
    pub async fn find_or_create(&self, table: &str, values: Record) -> SormResult<Row> {
        let conditions = Conditions::from(&values);
        if let Some(row) = self
            .single(table, conditions, SearchOptions::default())
            .await?
        {
            return Ok(row);
        }

        self.insert(table, values).await
    }

    pub async fn find_or_insert(&self, table: &str, values: Record) -> SormResult<Row> {
        self.find_or_create(table, values).await
    }

    /// Run a statement, ignoring any rows it returns.
    pub async fn do_sql(&self, sql: &str, binds: Vec<Value>) -> SormResult<()> {
        self.run(Rendered {
            sql: sql.to_string(),
            binds,
        })
        .await
    }

    pub async fn search_by_sql(
        &self,
        sql: &str,
        binds: Vec<Value>,
        table: Option<&str>,
    ) -> SormResult<Rows> {
        let rendered = Rendered {
            sql: sql.to_string(),
            binds,
        };
        self.materialize(rendered, Vec::new(), table.map(str::to_string))
            .await
    }

    /// Like `search_by_sql`, with `:name` placeholders.
    pub async fn search_named(
        &self,
        sql: &str,
        params: &HashMap<String, Value>,
        table: Option<&str>,
    ) -> SormResult<Rows> {
        let rendered = bind_named(sql, params)?;
        self.materialize(rendered, Vec::new(), table.map(str::to_string))
            .await
    }

    async fn run(&self, rendered: Rendered) -> SormResult<()> {
        let mut cursor = self.execute(&rendered.sql, &rendered.binds).await?;
        cursor.close();
        Ok(())
    }

    fn to_storage(&self, table: &str, values: Record) -> Record {
        values
            .into_iter()
            .map(|(column, value)| {
                let stored = self.schema().to_storage(table, &column, value);
                (column, stored)
            })
            .collect()
    }

    async fn retrieve_inserted(&self, table: &str, stored: &Record) -> SormResult<Row> {
        let failed = |reason: &str, source: Option<SormError>| SormError::InsertRetrieval {
            table: table.to_string(),
            reason: reason.to_string(),
            source: source.map(Box::new),
        };

        let pk = match self.schema().table_info(table).and_then(|info| info.pk()) {
            Some(pk) => pk.to_string(),
            None => return Err(failed("table has no primary key", None)),
        };

        let id = match stored.get(&pk) {
            Some(id) if !id.is_null() => id.clone(),
            _ => match self.last_insert_id(table, &pk).await {
                Ok(Some(id)) => id,
                Ok(None) => return Err(failed("driver reported no inserted id", None)),
                Err(err) => return Err(failed("could not read the inserted id", Some(err))),
            },
        };

        match self
            .single(table, Conditions::new().and(pk, id), SearchOptions::default())
            .await
        {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(failed("no row with the inserted id", None)),
            Err(err) => Err(failed("reading the row back failed", Some(err))),
        }
    }
}

fn append_where(builder: &mut SqlBuilder, conditions: &Conditions) -> SormResult<()> {
    let where_ = render_where(conditions)?;
    if !where_.sql.is_empty() {
        builder.push(" ");
        builder.append(where_);
    }
    Ok(())
}

/// Rewrite `:name` placeholders into positional binds.
///
/// Quoted text and `::` casts are left alone.
fn bind_named(sql: &str, params: &HashMap<String, Value>) -> SormResult<Rendered> {
    let mut builder = SqlBuilder::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                builder.push(ch.encode_utf8(&mut [0; 4]));
            }
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                builder.push(ch.encode_utf8(&mut [0; 4]));
            }
            None if ch == ':'
                && prev != Some(':')
                && matches!(chars.peek(), Some(next) if next.is_ascii_alphabetic() || *next == '_') =>
            {
                let mut name = String::new();
                while let Some(next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = params.get(&name).ok_or_else(|| {
                    SormError::MalformedQuery(format!("no value for placeholder :{}", name))
                })?;
                builder.push_bind(value.clone());
                prev = name.chars().last();
                continue;
            }
            None => builder.push(ch.encode_utf8(&mut [0; 4])),
        }
        prev = Some(ch);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, TableSchema};
    use crate::testing::MockDriver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect()
    }

    fn user_schema() -> Schema {
        Schema::new().table(
            TableSchema::new("user")
                .primary_key("id")
                .columns(["id", "name"])
                .deflate("name", |value| match value {
                    Value::Text(s) => Value::Text(s.to_lowercase()),
                    other => other,
                }),
        )
    }

    #[test]
    fn named_placeholders() {
        let mut params = HashMap::new();
        params.insert("id".to_string(), Value::Int(3));
        params.insert("name".to_string(), Value::from("x"));

        let rendered = bind_named(
            "SELECT * FROM user WHERE id = :id AND name = :name AND note != ':id' AND n::text = :id",
            &params,
        )
        .unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT * FROM user WHERE id = ? AND name = ? AND note != ':id' AND n::text = ?"
        );
        assert_eq!(rendered.binds, vec![Value::Int(3), Value::from("x"), Value::Int(3)]);

        assert!(matches!(
            bind_named("SELECT :missing", &params),
            Err(SormError::MalformedQuery(_))
        ));
    }

    #[tokio::test]
    async fn search_renders_declared_columns_and_options() {
        let driver = MockDriver::new();
        let session = driver.session_with(user_schema());

        let rows = session
            .search(
                "user",
                Conditions::new()
                    .and("name", Predicate::like("a%"))
                    .and("id", Predicate::cmp(">", 10)),
                SearchOptions::default()
                    .order_by(OrderSpec::desc("id"))
                    .limit(5)
                    .offset(10),
            )
            .await
            .unwrap()
            .all()
            .await
            .unwrap();
        assert!(rows.is_empty());

        let (sql, binds) = driver.last_statement();
        assert_eq!(
            sql,
            "SELECT id, name FROM user WHERE name LIKE ? AND id > ? ORDER BY id DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(binds, vec![Value::from("a%"), Value::Int(10)]);
    }

    #[tokio::test]
    async fn search_unknown_table_selects_star() {
        let driver = MockDriver::new();
        let session = driver.session();
        session
            .search("misc", Conditions::new(), SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(driver.last_statement().0, "SELECT * FROM misc");
    }

    #[tokio::test]
    async fn count_renders_alias() {
        let driver = MockDriver::new();
        let session = driver.session_with(user_schema());
        driver.push_result(&["n"], vec![vec![Value::Int(4)]]);

        let row = session
            .count("user", ("n", "id"), Conditions::new().and("name", "bob"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.get("n").unwrap(), Value::Int(4));
        assert_eq!(
            driver.last_statement().0,
            "SELECT COUNT(id) AS n FROM user WHERE name = ?"
        );
    }

    #[tokio::test]
    async fn insert_deflates_and_reads_back_by_last_insert_id() {
        let driver = MockDriver::new();
        let session = driver.session_with(user_schema());
        driver.set_last_insert_id(Some(Value::Int(42)));
        driver.push_result(&[], vec![]);
        driver.push_result(&["id", "name"], vec![vec![42.into(), "bob".into()]]);

        let row = session
            .insert("user", record(&[("name", "BOB".into())]))
            .await
            .unwrap();
        assert_eq!(row.get("id").unwrap(), Value::Int(42));

        let statements = driver.statements();
        assert_eq!(statements[0].0, "INSERT INTO user (name) VALUES (?)");
        assert_eq!(statements[0].1, vec![Value::from("bob")]);
        assert_eq!(statements[1].0, "SELECT id, name FROM user WHERE id = ? LIMIT 1");
        assert_eq!(statements[1].1, vec![Value::Int(42)]);
    }

    #[tokio::test]
    async fn insert_prefers_the_given_primary_key() {
        let driver = MockDriver::new();
        let session = driver.session_with(user_schema());
        driver.push_result(&[], vec![]);
        driver.push_result(&["id", "name"], vec![vec![5.into(), "a".into()]]);

        session
            .insert("user", record(&[("id", 5.into()), ("name", "a".into())]))
            .await
            .unwrap();

        assert_eq!(driver.statements()[1].1, vec![Value::Int(5)]);
    }

    #[tokio::test]
    async fn insert_retrieval_failures_are_reported() {
        let driver = MockDriver::new();
        let session = driver.session_with(
            user_schema().table(TableSchema::new("log").columns(["line"])),
        );

        let err = session
            .insert("log", record(&[("line", "x".into())]))
            .await
            .unwrap_err();
        assert!(matches!(err, SormError::InsertRetrieval { ref table, .. } if table == "log"));
        assert_eq!(driver.statements().len(), 1);

        // no id from the driver
        let err = session
            .insert("user", record(&[("name", "x".into())]))
            .await
            .unwrap_err();
        assert!(matches!(err, SormError::InsertRetrieval { .. }));
    }

    #[tokio::test]
    async fn bulk_insert_without_driver_support() {
        let driver = MockDriver::new();
        let session = driver.session_with(user_schema());

        let err = session
            .bulk_insert("user", vec![record(&[("name", "a".into())])])
            .await
            .unwrap_err();
        assert!(matches!(err, SormError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn update_without_values_is_rejected() {
        let driver = MockDriver::new();
        let session = driver.session_with(user_schema());
        let err = session
            .update("user", Record::new(), Conditions::new().and("id", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SormError::MalformedQuery(_)));
        assert!(driver.statements().is_empty());
    }

    #[tokio::test]
    async fn pre_update_changes_reach_the_statement() {
        let driver = MockDriver::new();
        let schema = user_schema().trigger("user", Trigger::PreUpdate, |_, args| {
            if let TriggerArgs::Values(values) = args {
                values.insert("name".to_string(), Value::from("FROM HOOK"));
            }
        });
        let session = driver.session_with(schema);

        session
            .update(
                "user",
                record(&[("name", "given".into())]),
                Conditions::new().and("id", 3),
            )
            .await
            .unwrap();

        let update = &driver.statements()[0];
        assert_eq!(update.0, "UPDATE user SET name = ? WHERE id = ?");
        assert_eq!(update.1, vec![Value::from("from hook"), Value::Int(3)]);
    }

    #[tokio::test]
    async fn post_update_sees_the_reread_row_only_when_found() {
        let driver = MockDriver::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hook_seen = seen.clone();
        let schema = user_schema().trigger("user", Trigger::PostUpdate, move |_, args| {
            if let TriggerArgs::Row(row) = args {
                hook_seen.lock().push(row.get("name").unwrap());
            }
        });
        let session = driver.session_with(schema);

        driver.push_result(&[], vec![]);
        driver.push_result(&["id", "name"], vec![vec![3.into(), "reread".into()]]);
        let row = session
            .update(
                "user",
                record(&[("name", "x".into())]),
                Conditions::new().and("id", 3),
            )
            .await
            .unwrap();
        assert!(row.is_some());
        assert_eq!(*seen.lock(), vec![Value::from("reread")]);

        // no row matches: nothing to hand to the hook
        let row = session
            .update(
                "user",
                record(&[("name", "x".into())]),
                Conditions::new().and("id", 4),
            )
            .await
            .unwrap();
        assert!(row.is_none());
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn post_insert_sees_the_fetched_row() {
        let driver = MockDriver::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hook_seen = seen.clone();
        let schema = user_schema().trigger("user", Trigger::PostInsert, move |table, args| {
            if let TriggerArgs::Row(row) = args {
                hook_seen
                    .lock()
                    .push((table.to_string(), row.get_columns()));
            }
        });
        let session = driver.session_with(schema);
        driver.set_last_insert_id(Some(Value::Int(9)));
        driver.push_result(&[], vec![]);
        driver.push_result(&["id", "name"], vec![vec![9.into(), "stored".into()]]);

        session
            .insert("user", record(&[("name", "given".into())]))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "user");
        assert_eq!(seen[0].1["id"], Value::Int(9));
        assert_eq!(seen[0].1["name"], Value::from("stored"));
    }

    #[tokio::test]
    async fn delete_hooks_get_conditions_then_table() {
        let driver = MockDriver::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (pre, post) = (seen.clone(), seen.clone());
        let schema = user_schema()
            .trigger("user", Trigger::PreDelete, move |_, args| {
                if let TriggerArgs::Where(conditions) = args {
                    pre.lock().push(format!("pre:{}", conditions.len()));
                }
            })
            .trigger("user", Trigger::PostDelete, move |table, args| {
                assert!(matches!(args, TriggerArgs::Table));
                post.lock().push(format!("post:{}", table));
            });
        let session = driver.session_with(schema);

        session
            .delete("user", Conditions::new().and("id", 1))
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec!["pre:1", "post:user"]);
        assert_eq!(driver.last_statement().0, "DELETE FROM user WHERE id = ?");
    }

    #[tokio::test]
    async fn find_or_create_hit_runs_no_insert() {
        let driver = MockDriver::new();
        let inserts = Arc::new(AtomicUsize::new(0));
        let counter = inserts.clone();
        let schema = user_schema().trigger("user", Trigger::PreInsert, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let session = driver.session_with(schema);
        driver.push_result(&["id", "name"], vec![vec![1.into(), "a".into()]]);

        let row = session
            .find_or_create("user", record(&[("name", "a".into())]))
            .await
            .unwrap();

        assert_eq!(row.get("id").unwrap(), Value::Int(1));
        assert_eq!(inserts.load(Ordering::SeqCst), 0);
        assert_eq!(driver.statements().len(), 1);
    }

    #[tokio::test]
    async fn profiler_sees_statement_text_only() {
        let driver = MockDriver::new();
        let session = Session::builder(driver.clone())
            .config(crate::Config {
                profile: true,
                on_connect_do: vec!["PRAGMA foreign_keys = ON".into()],
                ..crate::Config::default()
            })
            .build();

        session
            .do_sql("DELETE FROM user WHERE name = ?", vec!["secret".into()])
            .await
            .unwrap();

        let log = session.query_log().unwrap().queries();
        assert_eq!(
            log,
            vec!["PRAGMA foreign_keys = ON", "DELETE FROM user WHERE name = ?"]
        );
        assert!(!log.iter().any(|sql| sql.contains("secret")));
    }

    #[tokio::test]
    async fn failing_profiler_is_not_fatal() {
        struct Broken;
        impl crate::Profiler for Broken {
            fn record_query(&self, _sql: &str) -> Result<(), crate::profile::ProfileError> {
                Err("disk full".into())
            }
        }

        let driver = MockDriver::new();
        let session = Session::builder(driver.clone())
            .profiler(Arc::new(Broken))
            .build();

        session.do_sql("SELECT 1", vec![]).await.unwrap();
        assert_eq!(driver.statements().len(), 1);
    }

    #[tokio::test]
    async fn driver_errors_surface_as_statement_errors() {
        let driver = MockDriver::new();
        driver.fail_next("no such table: nope");
        let session = driver.session();

        let err = session.do_sql("SELECT * FROM nope", vec![]).await.unwrap_err();
        match err {
            SormError::Statement { sql, source } => {
                assert_eq!(sql, "SELECT * FROM nope");
                assert_eq!(source.to_string(), "no such table: nope");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn resultset_and_disconnect() {
        let driver = MockDriver::new();
        let session = driver.session();
        driver.push_result(&["id"], vec![vec![3.into()]]);

        let mut fragment = session.resultset();
        fragment.add_select("id", None).from(["user"]).add_where("id", 3);
        let row = fragment.retrieve(Some("user")).await.unwrap().first().await.unwrap();
        assert_eq!(row.unwrap().table(), Some("user"));

        session.disconnect().await;
        session.do_sql("SELECT 1", vec![]).await.unwrap();
        assert_eq!(driver.connects(), 2);
    }
}
