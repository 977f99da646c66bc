//! Request-scoped state threaded through the middleware chain.

use std::collections::HashMap;

use crate::request::Request;

/// Per-request state passed by `&mut` to every middleware stage.
///
/// Owns the [`Request`] while it travels through the chain, plus a small
/// string map for values stages want to hand to each other. One context
/// exists per request and is dropped once the response has been produced.
pub struct Context {
    request: Request,
    values: HashMap<String, String>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self { request, values: HashMap::new() }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn request_mut(&mut self) -> &mut Request { &mut self.request }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}
