//! The response write path.
//!
//! Handlers return a [`Response`](crate::Response) value; the endpoint at the
//! end of the middleware chain replays it into a [`ResponseWriter`]. Stages
//! that want to see what goes out on the wire wrap the writer they were
//! given, the way [`BodyCapturingWriter`] does, and pass the wrapper on.
//!
//! ```text
//! handler → Response ─write()→ BodyCapturingWriter ─write()→ HttpResponseWriter
//!                                     │
//!                                     └─ copy → captured bytes
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// Byte sink for one response, plus its status line and headers.
///
/// The status may be changed at any point, including after body bytes have
/// been written; the last value set is the one sent.
pub trait ResponseWriter: io::Write + Send {
    fn status(&self) -> StatusCode;
    fn set_status(&mut self, status: StatusCode);
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

// ── Transport writer ──────────────────────────────────────────────────────────

/// The real writer: buffers the response and hands it to hyper.
#[derive(Debug, Default)]
pub struct HttpResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl HttpResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl io::Write for HttpResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for HttpResponseWriter {
    fn status(&self) -> StatusCode { self.status }
    fn set_status(&mut self, status: StatusCode) { self.status = status; }
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
}

// ── Capturing decorator ───────────────────────────────────────────────────────

/// Mirrors every byte the inner writer accepts into an in-memory buffer.
///
/// Writes are forwarded first and only the accepted prefix is copied, so the
/// captured bytes are always exactly what the transport received, in order,
/// even when the inner writer takes short writes. Status and headers pass
/// straight through.
pub struct BodyCapturingWriter<'w> {
    inner: &'w mut dyn ResponseWriter,
    captured: BytesMut,
}

impl<'w> BodyCapturingWriter<'w> {
    pub fn new(inner: &'w mut dyn ResponseWriter) -> Self {
        Self { inner, captured: BytesMut::new() }
    }

    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    pub fn into_captured(self) -> Bytes {
        self.captured.freeze()
    }
}

impl io::Write for BodyCapturingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ResponseWriter for BodyCapturingWriter<'_> {
    fn status(&self) -> StatusCode { self.inner.status() }
    fn set_status(&mut self, status: StatusCode) { self.inner.set_status(status); }
    fn headers(&self) -> &HeaderMap { self.inner.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use http_body_util::BodyExt;

    /// Accepts at most `limit` bytes per call.
    struct ShortWriter {
        inner: HttpResponseWriter,
        limit: usize,
    }

    impl io::Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.inner.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ResponseWriter for ShortWriter {
        fn status(&self) -> StatusCode { self.inner.status() }
        fn set_status(&mut self, status: StatusCode) { self.inner.set_status(status); }
        fn headers(&self) -> &HeaderMap { self.inner.headers() }
        fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }
    }

    async fn body_of(writer: HttpResponseWriter) -> Bytes {
        writer.into_response().into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn capture_matches_transport_across_chunks() {
        let mut transport = HttpResponseWriter::new();
        let captured = {
            let mut capture = BodyCapturingWriter::new(&mut transport);
            for chunk in [&b"{\"id\":"[..], &b"42"[..], &b"}"[..]] {
                capture.write_all(chunk).unwrap();
            }
            capture.into_captured()
        };

        assert_eq!(captured, Bytes::from_static(b"{\"id\":42}"));
        assert_eq!(body_of(transport).await, captured);
    }

    #[tokio::test]
    async fn short_writes_are_captured_exactly_once() {
        let mut transport = ShortWriter { inner: HttpResponseWriter::new(), limit: 3 };
        let captured = {
            let mut capture = BodyCapturingWriter::new(&mut transport);
            assert_eq!(capture.write(b"abcdefgh").unwrap(), 3);
            assert_eq!(capture.captured(), b"abc");
            capture.write_all(b"defgh").unwrap();
            capture.into_captured()
        };

        assert_eq!(captured, Bytes::from_static(b"abcdefgh"));
        assert_eq!(body_of(transport.inner).await, captured);
    }

    #[test]
    fn status_set_after_writes_reaches_the_transport() {
        let mut transport = HttpResponseWriter::new();
        {
            let mut capture = BodyCapturingWriter::new(&mut transport);
            capture.write_all(b"partial").unwrap();
            capture.set_status(StatusCode::BAD_GATEWAY);
            assert_eq!(capture.status(), StatusCode::BAD_GATEWAY);
        }
        assert_eq!(transport.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn default_status_is_ok() {
        assert_eq!(HttpResponseWriter::new().status(), StatusCode::OK);
    }
}
