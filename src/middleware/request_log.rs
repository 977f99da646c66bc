//! Inbound request record.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use http::HeaderMap;
use tracing::warn;

use super::{BoxFuture, ExclusionPolicy, Middleware, Next, correlation_id};
use crate::context::Context;
use crate::request::Request;
use crate::sink::{Level, Record, Sink, fields};
use crate::writer::ResponseWriter;

/// Message of the record this stage emits.
pub const REQUEST_INFORMATION: &str = "request_information";

/// Emits one `request_information` record before the handler runs.
///
/// At `Info` the record carries `xid`, `method` and `path_uri`. At `Debug`
/// it also carries the headers as JSON and the body, and is emitted at
/// `Debug`. The body is read through and replaced, so the handler still sees
/// every byte.
pub struct RequestRecorder {
    sink: Arc<dyn Sink>,
    exclusions: Arc<ExclusionPolicy>,
}

impl RequestRecorder {
    pub fn new(sink: Arc<dyn Sink>, exclusions: Arc<ExclusionPolicy>) -> Self {
        Self { sink, exclusions }
    }

    async fn record(&self, request: &mut Request) -> Record {
        let detailed = self.sink.level().is_detailed();
        let level = if detailed { Level::Debug } else { Level::Info };
        let record = Record::new(level, REQUEST_INFORMATION)
            .with(fields::XID, correlation_id(request).unwrap_or_default())
            .with(fields::METHOD, request.method().as_str())
            .with(fields::PATH_URI, request.route());
        if !detailed {
            return record;
        }

        let header = headers_json(request.headers());
        let body = request.replay_body().await;
        record
            .with(fields::HEADER, header)
            .with(fields::BODY, String::from_utf8_lossy(&body).into_owned())
    }
}

impl Middleware for RequestRecorder {
    fn name(&self) -> &'static str {
        "request_recorder"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        writer: &'a mut dyn ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self.exclusions.is_excluded(ctx.request().route()) {
                return next.run(ctx, writer).await;
            }

            let record = self.record(ctx.request_mut()).await;
            self.sink.emit(record);
            next.run(ctx, writer).await
        })
    }
}

/// Headers as a JSON object of name → list of values. Empty on failure.
fn headers_json(headers: &HeaderMap) -> String {
    let mut map: BTreeMap<&str, Vec<Cow<'_, str>>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(name.as_str())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()));
    }
    serde_json::to_string(&map).unwrap_or_else(|e| {
        warn!("request header serialization failed: {e}");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::testing::{drive, handler, request};
    use crate::response::Response;
    use crate::sink::{MemorySink, Value};

    use bytes::Bytes;
    use http_body_util::Full;

    fn post(path: &str, body: &'static str) -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .method("POST")
            .uri(path)
            .header("x-request-id", "abc-123")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    fn echo_body() -> crate::handler::BoxedHandler {
        handler(|mut req: Request| async move {
            match req.bytes().await {
                Ok(body) => Response::json(body.to_vec()),
                Err(_) => Response::text("unreadable"),
            }
        })
    }

    async fn run(level: Level, route: &str, body: &'static str) -> (Arc<MemorySink>, Bytes) {
        let sink = Arc::new(MemorySink::new(level));
        let stage = RequestRecorder::new(sink.clone(), Arc::new(ExclusionPolicy::default()));
        let out = drive(vec![Arc::new(stage)], echo_body(), request(route, post("/orders", body))).await;
        (sink, out.body)
    }

    fn text<'r>(record: &'r Record, name: &str) -> Option<&'r str> {
        record.get(name).and_then(Value::as_str)
    }

    #[tokio::test]
    async fn debug_records_headers_and_body_and_keeps_the_body() {
        let (sink, echoed) = run(Level::Debug, "/orders", r#"{"sku":"A1"}"#).await;

        assert_eq!(echoed, Bytes::from(r#"{"sku":"A1"}"#));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.level(), Level::Debug);
        assert_eq!(record.message(), REQUEST_INFORMATION);
        assert_eq!(text(record, fields::XID), Some("abc-123"));
        assert_eq!(text(record, fields::METHOD), Some("POST"));
        assert_eq!(text(record, fields::PATH_URI), Some("/orders"));
        assert_eq!(text(record, fields::BODY), Some(r#"{"sku":"A1"}"#));
        assert_eq!(
            text(record, fields::HEADER),
            Some(r#"{"content-type":["application/json"],"x-request-id":["abc-123"]}"#)
        );
    }

    #[tokio::test]
    async fn info_records_only_the_summary_fields() {
        let (sink, echoed) = run(Level::Info, "/orders", "payload").await;

        assert_eq!(echoed, Bytes::from("payload"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let names: Vec<_> = records[0].fields().iter().map(|f| f.name).collect();
        assert_eq!(names, ["xid", "method", "path_uri"]);
        assert_eq!(records[0].level(), Level::Info);
    }

    #[tokio::test]
    async fn excluded_routes_emit_nothing() {
        let (sink, echoed) = run(Level::Debug, "/readiness", "ping").await;
        assert_eq!(echoed, Bytes::from("ping"));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn repeated_headers_are_grouped() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/html".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());
        assert_eq!(headers_json(&headers), r#"{"accept":["text/html","application/json"]}"#);
    }
}
