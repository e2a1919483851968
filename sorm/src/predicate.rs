//!
//! Where/having predicates.
//!
//! A set of [`Conditions`] is always a conjunction. Values never end up in
//! the SQL text, they are rendered as `?` and pushed as binds.
//!

use crate::builder::SqlBuilder;
use crate::value::Value;
use crate::{SormError, SormResult};

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
    Range(Value, Value),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `column = value`, or `IN` for a list, or `IS NULL` for null.
    Eq(Operand),

    /// Operator-tagged comparison. The operator is only checked when rendered.
    Cmp { op: String, operand: Operand },
}

impl Predicate {
    pub fn eq(value: impl Into<Value>) -> Self {
        Predicate::Eq(Operand::Scalar(value.into()))
    }

    pub fn cmp(op: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Cmp {
            op: op.into(),
            operand: Operand::Scalar(value.into()),
        }
    }

    pub fn is_in<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Predicate::Cmp {
            op: "in".to_string(),
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Predicate::Cmp {
            op: "between".to_string(),
            operand: Operand::Range(low.into(), high.into()),
        }
    }

    pub fn is_null() -> Self {
        Self::cmp("is", Value::Null)
    }

    pub fn is_not_null() -> Self {
        Self::cmp("is not", Value::Null)
    }

    pub fn like(pattern: impl Into<String>) -> Self {
        Self::cmp("like", Value::Text(pattern.into()))
    }

    pub(crate) fn build(&self, column: &str, builder: &mut SqlBuilder) -> SormResult<()> {
        match self {
            Predicate::Eq(operand) => build_cmp(Op::Eq, column, operand, builder),
            Predicate::Cmp { op, operand } => {
                let op = Op::parse(op)?;
                build_cmp(op, column, operand, builder)
            }
        }
    }
}

impl<T: Into<Value>> From<T> for Predicate {
    fn from(value: T) -> Self {
        Predicate::eq(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    Between,
    Is,
    IsNot,
}

impl Op {
    fn parse(op: &str) -> SormResult<Self> {
        let normalized = op
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        Ok(match normalized.as_str() {
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "like" => Op::Like,
            "in" => Op::In,
            "between" => Op::Between,
            "is" => Op::Is,
            "is not" => Op::IsNot,
            _ => return Err(SormError::UnsupportedOperator(op.to_string())),
        })
    }

    fn keyword(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Like => "LIKE",
            Op::In => "IN",
            Op::Between => "BETWEEN",
            Op::Is => "IS",
            Op::IsNot => "IS NOT",
        }
    }
}

fn build_cmp(op: Op, column: &str, operand: &Operand, builder: &mut SqlBuilder) -> SormResult<()> {
    match (op, operand) {
        (Op::Eq | Op::Is, Operand::Scalar(Value::Null)) => {
            builder.push(column);
            builder.push(" IS NULL");
        }
        (Op::Ne | Op::IsNot, Operand::Scalar(Value::Null)) => {
            builder.push(column);
            builder.push(" IS NOT NULL");
        }
        (Op::Eq | Op::In, Operand::List(values)) => build_in(column, values, builder),
        (Op::In, Operand::Scalar(value)) => {
            build_in(column, std::slice::from_ref(value), builder);
        }
        (Op::Between, Operand::Range(low, high)) => build_between(column, low, high, builder),
        (Op::Between, Operand::List(values)) if values.len() == 2 => {
            build_between(column, &values[0], &values[1], builder)
        }
        (Op::Between, _) => {
            return Err(SormError::MalformedQuery(format!(
                "BETWEEN on {} needs exactly two bounds",
                column
            )))
        }
        (_, Operand::Scalar(value)) => {
            builder.push(column);
            builder.push(" ");
            builder.push(op.keyword());
            builder.push(" ");
            builder.push_bind(value.clone());
        }
        (_, _) => {
            return Err(SormError::MalformedQuery(format!(
                "operator {} on {} takes a single value",
                op.keyword(),
                column
            )))
        }
    }

    Ok(())
}

fn build_in(column: &str, values: &[Value], builder: &mut SqlBuilder) {
    if values.is_empty() {
        // Nothing can match an empty set.
        builder.push("1 = 0");
        return;
    }

    builder.push(column);
    builder.push(" IN (");
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.push_bind(value.clone());
    }
    builder.push(")");
}

fn build_between(column: &str, low: &Value, high: &Value, builder: &mut SqlBuilder) {
    builder.push(column);
    builder.push(" BETWEEN ");
    builder.push_bind(low.clone());
    builder.push(" AND ");
    builder.push_bind(high.clone());
}

/// An AND-ed list of `(column, predicate)` terms.
///
/// Adding a term for a column that already has one adds a second term.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conditions(Vec<(String, Predicate)>);

impl Conditions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn and(mut self, column: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        self.push(column, predicate);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, predicate: impl Into<Predicate>) {
        self.0.push((column.into(), predicate.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.0.iter().map(|(column, predicate)| (column.as_str(), predicate))
    }

    /// Render `<keyword> a = ? AND b < ? ...`; nothing for an empty set.
    pub(crate) fn build(&self, keyword: &str, builder: &mut SqlBuilder) -> SormResult<()> {
        if self.0.is_empty() {
            return Ok(());
        }

        builder.push(keyword);
        builder.push(" ");
        for (index, (column, predicate)) in self.0.iter().enumerate() {
            if index > 0 {
                builder.push(" AND ");
            }
            predicate.build(column, builder)?;
        }

        Ok(())
    }
}

impl<K, P> FromIterator<(K, P)> for Conditions
where
    K: Into<String>,
    P: Into<Predicate>,
{
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, predicate)| (column.into(), predicate.into()))
                .collect(),
        )
    }
}

impl From<&crate::value::Record> for Conditions {
    fn from(record: &crate::value::Record) -> Self {
        record
            .iter()
            .map(|(column, value)| (column.clone(), Predicate::eq(value.clone())))
            .collect()
    }
}
