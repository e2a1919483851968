//!
//! Table declarations, column transforms and trigger hooks.
//!
//! A [`Schema`] is built once and then shared, read-only, by a session.
//!

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::predicate::Conditions;
use crate::row::Row;
use crate::value::{Record, Value};
use crate::SormResult;

pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

pub type Hook = Arc<dyn Fn(&str, &mut TriggerArgs<'_>) + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Trigger {
    PreInsert,
    PostInsert,
    PreUpdate,
    PostUpdate,
    PreDelete,
    PostDelete,
}

/// What a trigger hook gets to see.
pub enum TriggerArgs<'a> {
    /// Pre insert/update: the values about to be written. May be modified.
    Values(&'a mut Record),
    /// Post insert/update: the row as read back.
    Row(&'a Row),
    /// Pre delete: the conditions of the delete.
    Where(&'a Conditions),
    /// Post delete: only the table name is passed.
    Table,
}

/// Storage encoding for a column: `encode` on write, `decode` on read.
#[derive(Clone)]
pub struct Codec {
    pub encode: Transform,
    pub decode: Transform,
}

impl Codec {
    pub fn new(
        encode: impl Fn(Value) -> Value + Send + Sync + 'static,
        decode: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// Text goes to storage as UTF-8 bytes and comes back as text.
    pub fn utf8() -> Self {
        Self::new(
            |value| match value {
                Value::Text(s) => Value::Bytes(s.into_bytes()),
                other => other,
            },
            |value| match value {
                Value::Bytes(bytes) => match String::from_utf8(bytes) {
                    Ok(s) => Value::Text(s),
                    Err(err) => Value::Bytes(err.into_bytes()),
                },
                other => other,
            },
        )
    }
}

#[derive(Clone, Default)]
struct ColumnTransforms {
    deflate: Option<Transform>,
    inflate: Option<Transform>,
    codec: Option<Codec>,
}

#[derive(Clone)]
pub struct TableSchema {
    name: String,
    pk: Option<String>,
    columns: Vec<String>,
    transforms: HashMap<String, ColumnTransforms>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pk: None,
            columns: Vec::new(),
            transforms: HashMap::new(),
        }
    }

    pub fn primary_key(mut self, pk: impl Into<String>) -> Self {
        self.pk = Some(pk.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn deflate(
        mut self,
        column: impl Into<String>,
        func: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transforms.entry(column.into()).or_default().deflate = Some(Arc::new(func));
        self
    }

    pub fn inflate(
        mut self,
        column: impl Into<String>,
        func: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transforms.entry(column.into()).or_default().inflate = Some(Arc::new(func));
        self
    }

    pub fn codec(mut self, column: impl Into<String>, codec: Codec) -> Self {
        self.transforms.entry(column.into()).or_default().codec = Some(codec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pk(&self) -> Option<&str> {
        self.pk.as_deref()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }
}

/// Schema-wide transform, applied to any column whose name matches.
struct Rule {
    pattern: Regex,
    deflate: Option<Transform>,
    inflate: Option<Transform>,
}

#[derive(Default)]
pub struct Schema {
    tables: HashMap<String, TableSchema>,
    rules: Vec<Rule>,
    hooks: HashMap<(String, Trigger), Vec<Hook>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Register inflate/deflate for every column matching `pattern`.
    ///
    /// Table specific transforms win over rules. Rules are tried in
    /// registration order.
    pub fn rule(
        mut self,
        pattern: &str,
        deflate: Option<Transform>,
        inflate: Option<Transform>,
    ) -> SormResult<Self> {
        let pattern = Regex::new(pattern).map_err(|err| {
            crate::SormError::MalformedQuery(format!("bad rule pattern: {}", err))
        })?;
        self.rules.push(Rule {
            pattern,
            deflate,
            inflate,
        });
        Ok(self)
    }

    pub fn trigger(
        mut self,
        table: impl Into<String>,
        trigger: Trigger,
        hook: impl Fn(&str, &mut TriggerArgs<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.hooks
            .entry((table.into(), trigger))
            .or_default()
            .push(Arc::new(hook));
        self
    }

    pub fn table_info(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    /// Run every hook registered for `(table, trigger)`. No hooks is fine.
    pub fn call_trigger(&self, table: &str, trigger: Trigger, args: &mut TriggerArgs<'_>) {
        if let Some(hooks) = self.hooks.get(&(table.to_string(), trigger)) {
            for hook in hooks {
                hook(table, args);
            }
        }
    }

    fn column(&self, table: Option<&str>, column: &str) -> Option<&ColumnTransforms> {
        table
            .and_then(|table| self.tables.get(table))
            .and_then(|info| info.transforms.get(column))
    }

    pub fn call_deflate(&self, table: Option<&str>, column: &str, value: Value) -> Value {
        if let Some(deflate) = self.column(table, column).and_then(|t| t.deflate.as_ref()) {
            return deflate(value);
        }
        match self.rule_for(column, |rule| rule.deflate.as_ref()) {
            Some(deflate) => deflate(value),
            None => value,
        }
    }

    pub fn call_inflate(&self, table: Option<&str>, column: &str, value: Value) -> Value {
        if let Some(inflate) = self.column(table, column).and_then(|t| t.inflate.as_ref()) {
            return inflate(value);
        }
        match self.rule_for(column, |rule| rule.inflate.as_ref()) {
            Some(inflate) => inflate(value),
            None => value,
        }
    }

    pub fn encode_for_storage(&self, table: Option<&str>, column: &str, value: Value) -> Value {
        match self.column(table, column).and_then(|t| t.codec.as_ref()) {
            Some(codec) => (codec.encode)(value),
            None => value,
        }
    }

    pub fn decode_from_storage(&self, table: Option<&str>, column: &str, value: Value) -> Value {
        match self.column(table, column).and_then(|t| t.codec.as_ref()) {
            Some(codec) => (codec.decode)(value),
            None => value,
        }
    }

    /// Deflate, then encode.
    pub(crate) fn to_storage(&self, table: &str, column: &str, value: Value) -> Value {
        let deflated = self.call_deflate(Some(table), column, value);
        self.encode_for_storage(Some(table), column, deflated)
    }

    /// Decode, then inflate.
    pub(crate) fn from_storage(&self, table: Option<&str>, column: &str, value: Value) -> Value {
        let decoded = self.decode_from_storage(table, column, value);
        self.call_inflate(table, column, decoded)
    }

    fn rule_for<'s>(
        &'s self,
        column: &str,
        pick: impl Fn(&'s Rule) -> Option<&'s Transform>,
    ) -> Option<&'s Transform> {
        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(column))
            .find_map(pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn upper(value: Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(s.to_uppercase()),
            other => other,
        }
    }

    #[test]
    fn table_transform_wins_over_rule() {
        let schema = Schema::new()
            .table(TableSchema::new("user").inflate("name", upper))
            .rule("^name$", None, Some(Arc::new(|_: Value| Value::Text("rule".into()))))
            .unwrap();

        assert_eq!(
            schema.call_inflate(Some("user"), "name", "bob".into()),
            Value::Text("BOB".into())
        );
        assert_eq!(
            schema.call_inflate(None, "name", "bob".into()),
            Value::Text("rule".into())
        );
        assert_eq!(
            schema.call_inflate(Some("user"), "other", "bob".into()),
            Value::Text("bob".into())
        );
    }

    #[test]
    fn write_deflates_before_encoding() {
        let schema = Schema::new().table(
            TableSchema::new("user")
                .deflate("name", upper)
                .codec("name", Codec::utf8()),
        );

        let stored = schema.to_storage("user", "name", "bob".into());
        assert_eq!(stored, Value::Bytes(b"BOB".to_vec()));

        let read = schema.from_storage(Some("user"), "name", stored);
        assert_eq!(read, Value::Text("BOB".into()));
    }

    #[test]
    fn hooks_run_in_order_and_missing_is_noop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = calls.clone();
        let second = calls.clone();
        let schema = Schema::new()
            .trigger("user", Trigger::PreInsert, move |_, args| {
                first.fetch_add(1, Ordering::SeqCst);
                if let TriggerArgs::Values(values) = args {
                    values.insert("created".into(), Value::Int(1));
                }
            })
            .trigger("user", Trigger::PreInsert, move |table, args| {
                assert_eq!(table, "user");
                if let TriggerArgs::Values(values) = args {
                    assert!(values.contains_key("created"));
                }
                second.fetch_add(1, Ordering::SeqCst);
            });

        let mut values = Record::new();
        schema.call_trigger("user", Trigger::PreInsert, &mut TriggerArgs::Values(&mut values));
        schema.call_trigger("user", Trigger::PostDelete, &mut TriggerArgs::Table);
        schema.call_trigger("post", Trigger::PreInsert, &mut TriggerArgs::Table);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(values.get("created"), Some(&Value::Int(1)));
    }

    #[test]
    fn bad_rule_pattern() {
        assert!(Schema::new().rule("(", None, None).is_err());
    }
}
