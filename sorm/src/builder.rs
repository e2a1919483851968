use crate::value::Value;

/// SQL text plus its positional binds.
///
/// Every `?` in `sql` has exactly one entry in `binds`, in the same order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl Rendered {
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

pub struct SqlBuilder {
    buf: String,
    binds: Vec<Value>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            binds: Vec::new(),
        }
    }

    pub fn build(self) -> Rendered {
        Rendered {
            sql: self.buf,
            binds: self.binds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push(&mut self, str: &str) {
        self.buf.push_str(str);
    }

    /// Push a `?` placeholder and its value.
    pub fn push_bind(&mut self, value: Value) {
        self.buf.push('?');
        self.binds.push(value);
    }

    /// Push `items` separated by `sep`.
    pub fn push_list<I, S>(&mut self, items: I, sep: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (index, item) in items.into_iter().enumerate() {
            if index > 0 {
                self.buf.push_str(sep);
            }
            self.buf.push_str(item.as_ref());
        }
    }

    /// Append another rendered piece, binds included.
    pub fn append(&mut self, rendered: Rendered) {
        self.buf.push_str(&rendered.sql);
        self.binds.extend(rendered.binds);
    }

    /// Push `?, ?, ...` for each value.
    pub fn push_binds(&mut self, values: impl IntoIterator<Item = Value>) {
        for (index, value) in values.into_iter().enumerate() {
            if index > 0 {
                self.buf.push_str(", ");
            }
            self.push_bind(value);
        }
    }
}

impl Default for SqlBuilder {
    fn default() -> Self {
        Self::new()
    }
}
