//!
//! The SELECT fragment.
//!
//! A [`Fragment`] accumulates the clauses of a SELECT and renders them into a
//! [`Rendered`] statement. Identifiers are inlined as given, values become
//! binds.
//!

use crate::builder::{Rendered, SqlBuilder};
use crate::predicate::{Conditions, Predicate};
use crate::rows::Rows;
use crate::{Session, SormError, SormResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderSpec {
    pub column: String,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Clone, Debug, PartialEq)]
struct Join {
    kind: JoinKind,
    table: String,
    on: String,
}

#[derive(Clone, Debug, PartialEq)]
struct SelectItem {
    expr: String,
    alias: Option<String>,
}

#[derive(Clone, Default)]
pub struct Fragment {
    select: Vec<SelectItem>,
    from: Vec<String>,
    joins: Vec<Join>,
    where_: Conditions,
    group_by: Vec<String>,
    having: Conditions,
    order: Vec<OrderSpec>,
    limit: Option<u64>,
    offset: Option<u64>,
    session: Option<Session>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    pub fn add_select(&mut self, expr: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.select.push(SelectItem {
            expr: expr.into(),
            alias: alias.map(str::to_string),
        });
        self
    }

    pub fn add_where(&mut self, column: impl Into<String>, predicate: impl Into<Predicate>) -> &mut Self {
        self.where_.push(column, predicate);
        self
    }

    pub fn add_having(&mut self, column: impl Into<String>, predicate: impl Into<Predicate>) -> &mut Self {
        self.having.push(column, predicate);
        self
    }

    /// Add a join. `on` is inlined verbatim and must only reference identifiers.
    pub fn add_join(
        &mut self,
        kind: JoinKind,
        table: impl Into<String>,
        on: impl Into<String>,
    ) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    pub fn from<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.from = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn order(&mut self, specs: impl IntoIterator<Item = OrderSpec>) -> &mut Self {
        self.order = specs.into_iter().collect();
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// The names rows of this fragment are keyed by: aliases, or the
    /// expression itself. Empty for `SELECT *`.
    pub fn select_columns(&self) -> Vec<String> {
        self.select
            .iter()
            .map(|item| item.alias.clone().unwrap_or_else(|| item.expr.clone()))
            .collect()
    }

    pub fn render(&self) -> SormResult<Rendered> {
        if self.from.is_empty() {
            return Err(SormError::MalformedQuery("no source table".to_string()));
        }

        let mut builder = SqlBuilder::new();
        builder.push("SELECT ");
        if self.select.is_empty() {
            builder.push("*");
        } else {
            for (index, item) in self.select.iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                builder.push(&item.expr);
                if let Some(alias) = &item.alias {
                    builder.push(" AS ");
                    builder.push(alias);
                }
            }
        }

        builder.push(" FROM ");
        builder.push_list(&self.from, ", ");

        for join in &self.joins {
            builder.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            builder.push(&join.table);
            builder.push(" ON ");
            builder.push(&join.on);
        }

        if !self.where_.is_empty() {
            builder.push(" ");
            self.where_.build("WHERE", &mut builder)?;
        }

        if !self.group_by.is_empty() {
            builder.push(" GROUP BY ");
            builder.push_list(&self.group_by, ", ");
        }

        if !self.having.is_empty() {
            builder.push(" ");
            self.having.build("HAVING", &mut builder)?;
        }

        if !self.order.is_empty() {
            builder.push(" ORDER BY ");
            for (index, spec) in self.order.iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                builder.push(&spec.column);
                builder.push(" ");
                builder.push(spec.direction.keyword());
            }
        }

        if let Some(limit) = self.limit {
            builder.push(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            builder.push(&format!(" OFFSET {}", offset));
        }

        Ok(builder.build())
    }

    /// Only the `WHERE ...` clause; empty text when there are no conditions.
    pub fn render_where_only(&self) -> SormResult<Rendered> {
        render_where(&self.where_)
    }

    /// Render and run through the owning session.
    pub async fn retrieve(&self, table: Option<&str>) -> SormResult<Rows> {
        let session = self.session.as_ref().ok_or_else(|| {
            SormError::UnsupportedOperation("fragment is not bound to a session".to_string())
        })?;
        let rendered = self.render()?;
        session
            .materialize(rendered, self.select_columns(), table.map(str::to_string))
            .await
    }
}

pub(crate) fn render_where(conditions: &Conditions) -> SormResult<Rendered> {
    let mut builder = SqlBuilder::new();
    conditions.build("WHERE", &mut builder)?;
    Ok(builder.build())
}

impl std::fmt::Debug for Fragment {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.render() {
            Ok(rendered) => write!(fmt, "Fragment({})", rendered.sql),
            Err(err) => write!(fmt, "Fragment(<{}>)", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn renders_every_clause_in_order() {
        let mut fragment = Fragment::new();
        fragment
            .add_select("user.id", None)
            .add_select("COUNT(post.id)", Some("posts"))
            .from(["user"])
            .add_join(JoinKind::Left, "post", "post.user_id = user.id")
            .add_where("user.age", Predicate::cmp(">", 20))
            .group_by(["user.id"])
            .add_having("COUNT(post.id)", Predicate::cmp(">=", 2))
            .order([OrderSpec::desc("posts"), OrderSpec::asc("user.id")])
            .limit(10)
            .offset(20);

        let rendered = fragment.render().unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT user.id, COUNT(post.id) AS posts FROM user \
             LEFT JOIN post ON post.user_id = user.id \
             WHERE user.age > ? GROUP BY user.id HAVING COUNT(post.id) >= ? \
             ORDER BY posts DESC, user.id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(rendered.binds, vec![Value::Int(20), Value::Int(2)]);
        assert_eq!(fragment.select_columns(), vec!["user.id", "posts"]);
    }

    #[test]
    fn star_without_select() {
        let rendered = Fragment::new().from(["a", "b"]).render().unwrap();
        assert_eq!(rendered.sql, "SELECT * FROM a, b");
        assert!(rendered.binds.is_empty());
    }

    #[test]
    fn setters_are_last_call_wins() {
        let mut fragment = Fragment::new();
        fragment.from(["a"]).from(["b"]).limit(1).limit(5);
        assert_eq!(fragment.render().unwrap().sql, "SELECT * FROM b LIMIT 5");
    }

    #[test]
    fn empty_from_is_malformed() {
        let mut fragment = Fragment::new();
        fragment.add_select("1", None);
        assert!(matches!(
            fragment.render(),
            Err(SormError::MalformedQuery(_))
        ));
    }

    #[test]
    fn placeholders_match_binds_and_render_is_deterministic() {
        let mut fragment = Fragment::new();
        fragment
            .from(["user"])
            .add_where("name", "O'Brien; DROP TABLE user")
            .add_where("id", Predicate::is_in(vec![1, 2]))
            .add_where("age", Predicate::between(1, 99))
            .add_where("email", Predicate::is_null());

        let first = fragment.render().unwrap();
        let second = fragment.render().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.placeholder_count(), first.binds.len());
        assert!(!first.sql.contains("O'Brien"));
        assert!(!first.sql.contains("99"));
    }

    #[test]
    fn where_only() {
        let mut fragment = Fragment::new();
        assert_eq!(fragment.render_where_only().unwrap(), Rendered::default());

        fragment
            .add_where("age", Predicate::cmp(">=", 18))
            .add_where("age", Predicate::cmp("<", 65));
        let rendered = fragment.render_where_only().unwrap();
        assert_eq!(rendered.sql, "WHERE age >= ? AND age < ?");
        assert_eq!(rendered.binds, vec![Value::Int(18), Value::Int(65)]);
    }

    #[test]
    fn unsupported_operator_fails_render() {
        let mut fragment = Fragment::new();
        fragment.from(["t"]).add_having("n", Predicate::cmp("regexp", "x"));
        assert!(matches!(
            fragment.render(),
            Err(SormError::UnsupportedOperator(_))
        ));
    }
}
