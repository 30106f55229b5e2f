//! Recording transport for tests.
//!
//! [`MockTransport`] is a cheap, cloneable handle: hand one clone to the code
//! under test and keep another to script answers and inspect the calls made.
//!
//! Scripted answers are consumed in order. Once the queue is empty every call
//! receives the sticky default answer (initially `null`), which makes "the
//! service always says `true`" a one-liner.
//!
//! ```ignore
//! use emma_transport::{Method, MockTransport, Params, Transport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.respond_with(json!({"member_id": 201}));
//!
//! let body = mock.get("/members/201", &Params::new()).unwrap();
//! assert_eq!(body["member_id"], 201);
//! assert_eq!(mock.called(), 1);
//! assert_eq!(mock.last_call().unwrap().method, Method::Get);
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::adapter::{Method, Transport};
use crate::error::{Error, Result};
use crate::params::Params;

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// HTTP verb.
    pub method: Method,
    /// Account-relative path.
    pub path: String,
    /// Query params or JSON body.
    pub params: Params,
}

impl Call {
    /// Builds an expected call for comparisons in tests.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Params::new(),
        };
        Self {
            method,
            path: path.into(),
            params,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    scripted: VecDeque<Result<Value>>,
    default: Value,
    calls: Vec<Call>,
}

/// Transport that records calls and replays scripted responses.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<State>>,
}

impl MockTransport {
    /// Creates a mock answering `null` to everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the answer used once scripted responses run out.
    pub fn respond_with(&self, value: Value) {
        self.state.borrow_mut().default = value;
    }

    /// Queues a single successful answer.
    pub fn expect(&self, value: Value) {
        self.state.borrow_mut().scripted.push_back(Ok(value));
    }

    /// Queues a single failing answer.
    pub fn expect_err(&self, error: Error) {
        self.state.borrow_mut().scripted.push_back(Err(error));
    }

    /// Number of requests issued so far.
    #[must_use]
    pub fn called(&self) -> usize {
        self.state.borrow().calls.len()
    }

    /// Every request issued so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_call(&self) -> Option<Call> {
        self.state.borrow().calls.last().cloned()
    }

    /// Forgets recorded calls, keeping scripted answers.
    pub fn reset_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn record(&self, method: Method, path: &str, params: &Params) -> Result<Value> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            params: params.clone(),
        });
        match state.scripted.pop_front() {
            Some(answer) => answer,
            None => Ok(state.default.clone()),
        }
    }
}

impl Transport for MockTransport {
    fn get(&self, path: &str, params: &Params) -> Result<Value> {
        self.record(Method::Get, path, params)
    }

    fn post(&self, path: &str, body: &Params) -> Result<Value> {
        self.record(Method::Post, path, body)
    }

    fn put(&self, path: &str, body: &Params) -> Result<Value> {
        self.record(Method::Put, path, body)
    }

    fn delete(&self, path: &str, params: &Params) -> Result<Value> {
        self.record(Method::Delete, path, params)
    }
}
