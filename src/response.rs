//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`] and return it. At the end of the middleware
//! chain it is replayed into the request's
//! [`ResponseWriter`](crate::ResponseWriter): status first, then headers,
//! then one `write` per body chunk.

use std::io::{self, Write};

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use tracing::warn;

use crate::writer::ResponseWriter;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use trailmark::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status, headers, or a body in several chunks)
///
/// ```rust
/// use trailmark::{ContentType, Response, StatusCode};
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/orders/42")
///     .json(br#"{"id":42}"#.to_vec());
///
/// Response::builder()
///     .chunked(ContentType::Json, ["[", "1,2", "]"]);
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<Bytes>,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: Vec::new(), body: Vec::new() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Replays the response into `writer`.
    ///
    /// Headers that are not valid HTTP are skipped with a warning rather
    /// than failing the response.
    pub(crate) fn write_to(self, writer: &mut dyn ResponseWriter) -> io::Result<()> {
        writer.set_status(self.status);
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    writer.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        for chunk in &self.body {
            writer.write_all(chunk)?;
        }
        writer.flush()
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(ContentType::Json, vec![Bytes::from(body)])
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, vec![Bytes::from(body.into())])
    }

    /// Terminate with a typed body. Use this for XML, HTML, binary, SSE, etc.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type, vec![Bytes::from(body)])
    }

    /// Terminate with a body written in several pieces, one write each.
    pub fn chunked<I>(self, content_type: ContentType, chunks: I) -> Response
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        self.finish(content_type, chunks.into_iter().map(Into::into).collect())
    }

    /// Terminate with no body (e.g. `204 No Content`, `301 Moved Permanently`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Vec::new() }
    }

    fn finish(self, content_type: ContentType, body: Vec<Bytes>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body: body.into_iter().filter(|c| !c.is_empty()).collect() }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::HttpResponseWriter;

    use http_body_util::BodyExt;

    /// Counts write calls on top of the transport writer.
    #[derive(Default)]
    struct Counting {
        inner: HttpResponseWriter,
        writes: usize,
    }

    impl Write for Counting {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ResponseWriter for Counting {
        fn status(&self) -> StatusCode { self.inner.status() }
        fn set_status(&mut self, status: StatusCode) { self.inner.set_status(status); }
        fn headers(&self) -> &http::HeaderMap { self.inner.headers() }
        fn headers_mut(&mut self) -> &mut http::HeaderMap { self.inner.headers_mut() }
    }

    #[tokio::test]
    async fn builder_response_is_written_in_order() {
        let mut writer = HttpResponseWriter::new();
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/orders/99")
            .json(br#"{"id":"99"}"#.to_vec())
            .write_to(&mut writer)
            .unwrap();

        let res = writer.into_response();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(res.headers()["location"], "/orders/99");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from(r#"{"id":"99"}"#));
    }

    #[test]
    fn chunks_become_separate_writes() {
        let mut writer = Counting::default();
        Response::builder()
            .chunked(ContentType::Text, ["a", "", "b", "c"])
            .write_to(&mut writer)
            .unwrap();
        assert_eq!(writer.writes, 3);
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let mut writer = HttpResponseWriter::new();
        Response::builder()
            .header("bad header", "x")
            .header("x-ok", "yes")
            .no_body()
            .write_to(&mut writer)
            .unwrap();
        let res = writer.into_response();
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.headers()["x-ok"], "yes");
    }

    #[test]
    fn status_into_response() {
        let res = StatusCode::NOT_FOUND.into_response();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
