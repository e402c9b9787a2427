//! Shared fixtures for loader integration tests.
#![allow(dead_code)]

use asupersync::runtime::RuntimeBuilder;
use selectin::{Cx, Error, Executor, KeyTuple, Outcome, Record, Select, Value};
use std::sync::Mutex;

/// In-memory executor: filters its rows by the template's key-set columns,
/// recording every binding it receives.
pub struct MockExecutor {
    rows: Vec<Record>,
    calls: Mutex<Vec<Vec<KeyTuple>>>,
    fail_on_call: Option<usize>,
}

impl MockExecutor {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            calls: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    /// Fail the `call`-th execution (1-based) with an execution error.
    pub fn failing_on(rows: Vec<Record>, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(rows)
        }
    }

    /// Every key binding received, one entry per executed batch.
    pub fn calls(&self) -> Vec<Vec<KeyTuple>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    fn run(&self, query: &Select, keys: &[KeyTuple]) -> Outcome<Vec<Record>, Error> {
        let call_number = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(keys.to_vec());
            calls.len()
        };
        if self.fail_on_call == Some(call_number) {
            return Outcome::Err(Error::execution("injected executor failure"));
        }

        let columns: Vec<&str> = query
            .key_set_columns()
            .expect("template must carry a key set")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let matched = self
            .rows
            .iter()
            .filter(|row| {
                row.key_tuple(&columns)
                    .is_some_and(|key| keys.contains(&key))
            })
            .cloned()
            .collect();
        Outcome::Ok(matched)
    }
}

impl Executor for MockExecutor {
    fn fetch_in_set(
        &self,
        _cx: &Cx,
        query: &Select,
        keys: &[KeyTuple],
    ) -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send {
        let result = self.run(query, keys);
        async move { result }
    }
}

/// Drive a future on a current-thread runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(future)
}

pub fn int_key(values: &[i64]) -> KeyTuple {
    KeyTuple::new(values.iter().map(|&v| Value::Int(v)).collect())
}

pub fn user(id: i64, name: &str) -> Record {
    Record::new().with("id", id).with("name", name)
}

pub fn article(id: i64, author_id: Option<i64>) -> Record {
    Record::new().with("id", id).with("author_id", author_id)
}

pub fn comment(id: i64, article_id: i64, body: &str) -> Record {
    Record::new()
        .with("id", id)
        .with("article_id", article_id)
        .with("body", body)
}
