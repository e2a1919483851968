//!
//! Row shapes.
//!
//! A shape is the ordered list of names a query selected. Rows with the same
//! shape share one [`Shape`], which knows the accessor names for them.
//!

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Method names of [`Row`](crate::Row). A column with one of these names gets
/// no accessor and is reached through `get_column` instead.
pub(crate) const ROW_METHODS: &[&str] = &[
    "delete",
    "get",
    "get_column",
    "get_columns",
    "project",
    "raw_columns",
    "select_columns",
    "table",
    "try_get",
    "update",
];

#[derive(Debug)]
pub(crate) struct Shape {
    columns: Vec<String>,
    /// accessor name → index into `columns`
    accessors: HashMap<String, usize>,
}

impl Shape {
    fn new(columns: Vec<String>) -> Self {
        let mut accessors = HashMap::new();
        for (index, alias) in columns.iter().enumerate() {
            let name = base_name(alias);
            if ROW_METHODS.contains(&name) {
                continue;
            }
            accessors.insert(name.to_string(), index);
        }

        Self { columns, accessors }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The alias behind accessor `name`.
    pub fn accessor(&self, name: &str) -> Option<&str> {
        self.accessors
            .get(name)
            .map(|index| self.columns[*index].as_str())
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.iter().any(|alias| base_name(alias) == column)
    }
}

/// Strip a `table.` qualifier: `user.name` → `name`.
pub(crate) fn base_name(alias: &str) -> &str {
    match alias.split_once('.') {
        Some((qualifier, column)) if is_ident(qualifier) && is_ident(column) => column,
        _ => alias,
    }
}

/// The `table` of `table.column`, if there is one.
pub(crate) fn qualifier(alias: &str) -> Option<&str> {
    match alias.split_once('.') {
        Some((qualifier, column)) if is_ident(qualifier) && is_ident(column) => Some(qualifier),
        _ => None,
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

/// Shapes seen by one session.
#[derive(Debug, Default)]
pub(crate) struct ShapeCache {
    shapes: Mutex<HashMap<Vec<String>, Arc<Shape>>>,
}

impl ShapeCache {
    pub fn get_or_insert(&self, columns: &[String]) -> Arc<Shape> {
        let mut shapes = self.shapes.lock();
        if let Some(shape) = shapes.get(columns) {
            return shape.clone();
        }

        let shape = Arc::new(Shape::new(columns.to_vec()));
        shapes.insert(columns.to_vec(), shape.clone());
        shape
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.shapes.lock().len()
    }
}
