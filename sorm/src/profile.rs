//!
//! Query profiling.
//!
//! Only statement text is recorded, never bind values.
//!

use parking_lot::Mutex;

pub type ProfileError = Box<dyn std::error::Error + Send + Sync>;

pub trait Profiler: Send + Sync + 'static {
    /// Called before each statement. A failure is logged and otherwise ignored.
    fn record_query(&self, sql: &str) -> Result<(), ProfileError>;
}

/// Append-only, in-memory statement log.
#[derive(Debug, Default)]
pub struct QueryLog {
    queries: Mutex<Vec<String>>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.lock().is_empty()
    }
}

impl Profiler for QueryLog {
    fn record_query(&self, sql: &str) -> Result<(), ProfileError> {
        self.queries.lock().push(normalize(sql));
        Ok(())
    }
}

/// Collapse runs of whitespace so multi-line SQL logs as one line.
fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
