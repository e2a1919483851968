//! A scripted in-memory driver for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::database::{BufferedCursor, Connection, Cursor, Driver, DriverError};
use crate::{Config, Schema, Session, Value};

#[derive(Default)]
struct State {
    results: VecDeque<(Vec<String>, Vec<Vec<Value>>)>,
    statements: Vec<(String, Vec<Value>)>,
    last_insert_id: Option<Value>,
    fail_next: Option<String>,
    connects: usize,
}

/// Every `execute` is recorded and answered with the next pushed result,
/// or with no rows when none is left.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<State>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.state.lock().results.push_back((columns, rows));
    }

    pub fn set_last_insert_id(&self, id: Option<Value>) {
        self.state.lock().last_insert_id = id;
    }

    /// Fail the next statement with `message`.
    pub fn fail_next(&self, message: &str) {
        self.state.lock().fail_next = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().statements.clone()
    }

    pub fn last_statement(&self) -> (String, Vec<Value>) {
        self.state
            .lock()
            .statements
            .last()
            .cloned()
            .expect("no statement was executed")
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn session(&self) -> Session {
        self.session_with(Schema::new())
    }

    pub fn session_with(&self, schema: Schema) -> Session {
        Session::new(self.clone(), Config::default(), schema)
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn connect(&self, _config: &Config) -> Result<Box<dyn Connection>, DriverError> {
        self.state.lock().connects += 1;
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&mut self, sql: &str, binds: &[Value]) -> Result<Box<dyn Cursor>, DriverError> {
        let mut state = self.state.lock();
        state.statements.push((sql.to_string(), binds.to_vec()));

        if let Some(message) = state.fail_next.take() {
            return Err(message.into());
        }

        Ok(match state.results.pop_front() {
            Some((columns, rows)) => Box::new(BufferedCursor::new(columns, rows)),
            None => Box::new(BufferedCursor::empty()),
        })
    }

    async fn last_insert_id(&mut self, _table: &str, _pk: &str) -> Result<Option<Value>, DriverError> {
        Ok(self.state.lock().last_insert_id.clone())
    }
}
