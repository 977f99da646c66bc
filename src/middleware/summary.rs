//! One summary line per request.

use std::sync::Arc;
use std::time::Instant;

use super::{BoxFuture, ExclusionPolicy, Middleware, Next, correlation_id};
use crate::context::Context;
use crate::sink::{Level, Record, Sink, fields};
use crate::writer::ResponseWriter;

/// Prefix of the summary message.
pub const API_SUMMARY: &str = "api_summary";

/// Times the rest of the chain and emits one `Info` record when it returns:
///
/// ```text
/// api_summary: method=GET, path=/orders/:id, status=200
///     xid=… method=GET path_uri=/orders/:id status=200 latency=1.2ms
/// ```
///
/// The status is read from the writer after the chain finishes, so it is
/// the final one whatever the handler did in between. Emitted for every
/// status code and at every sink level; excluded routes are skipped before
/// the timer starts.
pub struct SummaryLogger {
    sink: Arc<dyn Sink>,
    exclusions: Arc<ExclusionPolicy>,
}

impl SummaryLogger {
    pub fn new(sink: Arc<dyn Sink>, exclusions: Arc<ExclusionPolicy>) -> Self {
        Self { sink, exclusions }
    }
}

impl Middleware for SummaryLogger {
    fn name(&self) -> &'static str {
        "summary_logger"
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

            let start = Instant::now();
            next.run(&mut *ctx, &mut *writer).await;
            let latency = start.elapsed();

            let request = ctx.request();
            let method = request.method().as_str();
            let path = request.route();
            let status = writer.status().as_u16();
            self.sink.emit(
                Record::new(Level::Info, format!("{API_SUMMARY}: method={method}, path={path}, status={status}"))
                    .with(fields::XID, correlation_id(request).unwrap_or_default())
                    .with(fields::METHOD, method)
                    .with(fields::PATH_URI, path)
                    .with(fields::STATUS, status)
                    .with(fields::LATENCY, latency),
            );
        })
    }
}
