use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

use crate::error::{DomainError, Result};
use crate::store::envelope::{unwrap_reply, Reply};
use crate::store::traits::BiobankApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request the mock received, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct Expectation {
    method: Method,
    path: String,
    query: Option<Vec<(String, String)>>,
    body: Option<Value>,
    http_status: Option<u16>,
    reply: Value,
}

/// Scripted in-memory backend.
///
/// Requests must arrive in the order they were expected; each one is answered with its
/// scripted reply envelope, which goes through the same unwrapping as the HTTP transport.
#[derive(Debug, Default)]
pub struct MockApi {
    expectations: Mutex<VecDeque<Expectation>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Builder returned by [`MockApi::expect`]; finish it with one of the `respond*` methods.
pub struct ExpectationBuilder<'a> {
    api: &'a MockApi,
    expectation: Expectation,
}

impl<'a> ExpectationBuilder<'a> {
    pub fn with_body(mut self, body: Value) -> Self {
        self.expectation.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.expectation.query = Some(query);
        self
    }

    /// Answer with `{status: "success", data}`.
    pub fn respond(self, data: Value) {
        self.respond_reply(None, Reply::success(data).to_value());
    }

    /// Answer with `{status: "error", message}`.
    pub fn respond_error(self, message: &str) {
        self.respond_reply(Some(400), Reply::error(message).to_value());
    }

    pub fn respond_reply(mut self, http_status: Option<u16>, reply: Value) {
        self.expectation.http_status = http_status;
        self.expectation.reply = reply;
        self.api.expectations.lock().push_back(self.expectation);
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, method: Method, path: &str) -> ExpectationBuilder<'_> {
        ExpectationBuilder {
            api: self,
            expectation: Expectation {
                method,
                path: path.to_string(),
                query: None,
                body: None,
                http_status: None,
                reply: Value::Null,
            },
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Panics when scripted requests were never made.
    pub fn verify_no_outstanding_expectation(&self) {
        let outstanding = self.expectations.lock();
        assert!(
            outstanding.is_empty(),
            "unsatisfied requests: {}",
            outstanding
                .iter()
                .map(|e| format!("{} {}", e.method, e.path))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    fn handle(&self, method: Method, path: &str, query: &[(String, String)], body: Option<Value>) -> Result<Value> {
        self.requests.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            query: query.to_vec(),
            body: body.clone(),
        });

        let expectation = self
            .expectations
            .lock()
            .pop_front()
            .ok_or_else(|| DomainError::Transport(format!("unexpected request: {} {}", method, path)))?;

        if expectation.method != method || expectation.path != path {
            return Err(DomainError::Transport(format!(
                "unexpected request: {} {}, expected {} {}",
                method, path, expectation.method, expectation.path
            )));
        }
        if let Some(expected_query) = &expectation.query {
            if expected_query.as_slice() != query {
                return Err(DomainError::Transport(format!(
                    "unexpected query for {} {}: {:?}",
                    method, path, query
                )));
            }
        }
        if let Some(expected_body) = &expectation.body {
            if Some(expected_body) != body.as_ref() {
                return Err(DomainError::Transport(format!(
                    "unexpected body for {} {}: {}",
                    method,
                    path,
                    body.unwrap_or(Value::Null)
                )));
            }
        }

        unwrap_reply(expectation.http_status, expectation.reply)
    }
}

#[async_trait::async_trait]
impl BiobankApi for MockApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.handle(Method::Get, path, query, None)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.handle(Method::Post, path, &[], Some(body))
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.handle(Method::Put, path, &[], Some(body))
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.handle(Method::Delete, path, &[], None)
    }
}
