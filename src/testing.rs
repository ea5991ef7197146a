//! In-memory store used by unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    bind_collector::BindValue,
    compiler::CompiledQuery,
    error::D1Error,
    store::{D1Database, D1PreparedStatement, D1Record, D1Result, FromDatabaseUrl},
};

#[derive(Default)]
struct MockState {
    responses: VecDeque<Result<D1Result, D1Error>>,
    executed: Vec<CompiledQuery>,
    prepared: usize,
}

/// A store that records every statement and replays queued responses
///
/// Clones share state, so a test can keep one handle while a connection owns another.
/// Once the queue runs dry every statement succeeds with no rows.
#[derive(Clone, Default)]
pub(crate) struct MockDatabase {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabase {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_result(self, result: D1Result) -> Self {
        self.state.lock().unwrap().responses.push_back(Ok(result));
        self
    }

    pub(crate) fn with_error(self, error: D1Error) -> Self {
        self.state.lock().unwrap().responses.push_back(Err(error));
        self
    }

    /// Every statement executed so far, in order
    pub(crate) fn executed(&self) -> Vec<CompiledQuery> {
        self.state.lock().unwrap().executed.clone()
    }

    pub(crate) fn prepare_count(&self) -> usize {
        self.state.lock().unwrap().prepared
    }
}

impl D1Database for MockDatabase {
    type Statement = MockStatement;

    fn prepare(&self, sql: &str) -> MockStatement {
        self.state.lock().unwrap().prepared += 1;
        MockStatement {
            state: Arc::clone(&self.state),
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }
}

impl FromDatabaseUrl for MockDatabase {
    fn from_database_url(database_url: &str) -> Result<Self, D1Error> {
        if database_url.starts_with("mock://") {
            Ok(Self::new())
        } else {
            Err(D1Error::Config(format!("not a mock url: {database_url}")))
        }
    }
}

pub(crate) struct MockStatement {
    state: Arc<Mutex<MockState>>,
    sql: String,
    params: Vec<BindValue>,
}

#[async_trait]
impl D1PreparedStatement for MockStatement {
    fn bind(mut self, params: Vec<BindValue>) -> Self {
        self.params = params;
        self
    }

    async fn all(self) -> Result<D1Result, D1Error> {
        self.respond()
    }
}

impl MockStatement {
    fn respond(self) -> Result<D1Result, D1Error> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(CompiledQuery {
            sql: self.sql,
            parameters: self.params,
        });
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(D1Result::default()))
    }
}

/// Build a record from a JSON object literal
pub(crate) fn record(value: Value) -> D1Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
