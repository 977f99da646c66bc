//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method, Uri, Version};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use tracing::warn;

use crate::error::{BoxError, Error};

/// Type-erased request body stream. It can be read once.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming HTTP request as seen by middleware and handlers.
///
/// The body is a stream. [`Request::bytes`] drains it, so a second call
/// yields an empty buffer.
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Body,
    params: HashMap<String, String>,
    route: Arc<str>,
}

impl Request {
    /// Wraps any `http::Request` whose body yields [`Bytes`].
    ///
    /// The route path starts out empty; the router fills it in once a route
    /// has matched.
    pub fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: body.map_err(Into::into).boxed_unsync(),
            params: HashMap::new(),
            route: Arc::from(""),
        }
    }

    pub(crate) fn with_route(mut self, route: Arc<str>, params: HashMap<String, String>) -> Self {
        self.route = route;
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    /// The raw request path, e.g. `/orders/42`.
    pub fn path(&self) -> &str { self.uri.path() }

    /// The route template that matched, e.g. `/orders/:id`.
    ///
    /// Empty when no route matched.
    pub fn route(&self) -> &str { &self.route }

    /// Header lookup. Returns `None` for absent or non-visible-ASCII values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/orders/:id`, `req.param("id")` on `/orders/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Reads the whole body into memory, leaving an empty stream behind.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        let body = std::mem::replace(&mut self.body, empty());
        let collected = body.collect().await.map_err(Error::Body)?;
        Ok(collected.to_bytes())
    }

    /// Reads the body for inspection and puts an identical stream back.
    ///
    /// A stream error ends the read early; whatever arrived before it is
    /// returned and becomes the replacement body. Trailers are dropped.
    pub(crate) async fn replay_body(&mut self) -> Bytes {
        let mut buf = BytesMut::new();
        while let Some(frame) = self.body.frame().await {
            match frame {
                Ok(frame) => {
                    if let Ok(data) = frame.into_data() {
                        buf.extend_from_slice(&data);
                    }
                }
                Err(e) => {
                    warn!(read = buf.len(), "request body read failed: {e}");
                    break;
                }
            }
        }
        let bytes = buf.freeze();
        self.body = full(bytes.clone());
        bytes
    }

    /// Copy of the request handed to the endpoint. Metadata is cloned; the
    /// body stream moves.
    pub(crate) fn fork(&mut self) -> Request {
        Request {
            method: self.method.clone(),
            uri: self.uri.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body: std::mem::replace(&mut self.body, empty()),
            params: self.params.clone(),
            route: Arc::clone(&self.route),
        }
    }
}

fn empty() -> Body {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync()
}

fn full(bytes: Bytes) -> Body {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}
