//! Correlation id middleware.
//!
//! Every request leaves this stage with an `x-request-id` header:
//!
//! 1. **Inbound header present and non-empty:** the value is reused
//!    verbatim and the request header is left as it arrived. Its format is
//!    not checked, so ids minted by a gateway or an upstream service survive
//!    every hop, whatever bytes they contain. Records show non-UTF-8 bytes
//!    as `U+FFFD`; the propagated header keeps the original bytes.
//! 2. **Absent or empty:** a random v4 UUID is generated and written to the
//!    request's own header map, where [`correlation_id`] and every later
//!    stage read it.
//!
//! Either way the id is also stored in the context under
//! [`REQUEST_ID_HEADER`] and set on the response headers so clients can
//! quote it back.

use std::borrow::Cow;
use std::fmt;

use http::HeaderValue;
use uuid::Uuid;

use super::{BoxFuture, Middleware, Next};
use crate::context::Context;
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Header that carries the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reads the current correlation id from the request headers.
///
/// Nothing is cached: a later change to the header is visible immediately.
/// Bytes that are not UTF-8 are replaced with `U+FFFD`.
pub fn correlation_id(request: &Request) -> Option<Cow<'_, str>> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .filter(|value| !value.is_empty())
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
}

/// An opaque, non-empty per-request identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// A fresh hyphenated v4 UUID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reuses or mints the correlation id. Runs for every request, excluded
/// paths included.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdProvider;

impl CorrelationIdProvider {
    pub fn new() -> Self {
        Self
    }

    /// Makes sure the request carries an id and returns it.
    pub fn ensure(&self, ctx: &mut Context, writer: &mut dyn ResponseWriter) -> CorrelationId {
        let request = ctx.request_mut();
        let inbound = request.headers().get(REQUEST_ID_HEADER).filter(|value| !value.is_empty()).cloned();
        let id = match inbound {
            Some(value) => {
                let id = CorrelationId(String::from_utf8_lossy(value.as_bytes()).into_owned());
                writer.headers_mut().insert(REQUEST_ID_HEADER, value);
                id
            }
            None => {
                let id = CorrelationId::generate();
                if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                    request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
                    writer.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                id
            }
        };
        ctx.set(REQUEST_ID_HEADER, id.as_str());
        id
    }
}

impl Middleware for CorrelationIdProvider {
    fn name(&self) -> &'static str {
        "correlation_id"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        writer: &'a mut dyn ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.ensure(ctx, writer);
            next.run(ctx, writer).await
        })
    }
}
