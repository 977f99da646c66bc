//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. The built-in stages together form the access-log
//! pipeline:
//!
//! | Stage | Job |
//! |---|---|
//! | [`CorrelationIdProvider`] | reuse or mint the `x-request-id` |
//! | [`SummaryLogger`] | one `api_summary` line per request, with latency |
//! | [`RequestRecorder`] | request method, route, and at debug: headers and body |
//! | [`ResponseRecorder`] | at debug: response body and final status |
//!
//! [`observability`] returns them in that order, which is the order
//! [`Router::observe`](crate::Router::observe) installs them in. The summary
//! stage is entered second but, since it wraps everything after it, its
//! record is the last one emitted.
//!
//! # Writing a stage
//!
//! ```rust
//! use trailmark::middleware::{BoxFuture, Middleware, Next};
//! use trailmark::{Context, ResponseWriter};
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str { "powered_by" }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a mut Context,
//!         writer: &'a mut dyn ResponseWriter,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, ()> {
//!         Box::pin(async move {
//!             writer.headers_mut().insert("x-powered-by", "trailmark".parse().unwrap());
//!             next.run(ctx, writer).await
//!         })
//!     }
//! }
//! ```

mod exclusion;
mod request_id;
mod request_log;
mod response_log;
mod summary;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::warn;

use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::sink::Sink;
use crate::writer::ResponseWriter;

pub use exclusion::ExclusionPolicy;
pub use request_id::{CorrelationId, CorrelationIdProvider, REQUEST_ID_HEADER, correlation_id};
pub use request_log::{REQUEST_INFORMATION, RequestRecorder};
pub use response_log::{RESPONSE_INFORMATION, ResponseRecorder};
pub use summary::{API_SUMMARY, SummaryLogger};

/// A heap-allocated, type-erased future borrowing for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stage in the chain.
///
/// A stage either calls `next.run(ctx, writer)` exactly once or answers the
/// request itself by writing to `writer` and returning. It may pass `next` a
/// different writer, typically one that wraps `writer`.
pub trait Middleware: Send + Sync + 'static {
    /// Stable name, used in diagnostics.
    fn name(&self) -> &'static str;

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        writer: &'a mut dyn ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, ()>;
}

/// The rest of the chain: the remaining stages, then the route handler.
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    endpoint: &'a BoxedHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stack: &'a [Arc<dyn Middleware>], endpoint: &'a BoxedHandler) -> Self {
        Self { stack, endpoint }
    }

    /// Runs the next stage, or the handler once the stages are used up.
    ///
    /// The handler receives the context's request (the body stream moves to
    /// it) and its [`Response`](crate::Response) is written to `writer`.
    pub fn run<'b>(self, ctx: &'b mut Context, writer: &'b mut dyn ResponseWriter) -> BoxFuture<'b, ()>
    where
        'a: 'b,
    {
        match self.stack.split_first() {
            Some((stage, rest)) => stage.handle(ctx, writer, Next { stack: rest, endpoint: self.endpoint }),
            None => {
                let endpoint = self.endpoint;
                Box::pin(async move {
                    let response = endpoint.call(ctx.request_mut().fork()).await;
                    if let Err(e) = response.write_to(writer) {
                        warn!(route = ctx.request().route(), "response write failed: {e}");
                    }
                })
            }
        }
    }
}

/// The access-log stages in installation order.
pub fn observability(sink: Arc<dyn Sink>, exclusions: ExclusionPolicy) -> Vec<Arc<dyn Middleware>> {
    let exclusions = Arc::new(exclusions);
    vec![
        Arc::new(CorrelationIdProvider::new()),
        Arc::new(SummaryLogger::new(Arc::clone(&sink), Arc::clone(&exclusions))),
        Arc::new(RequestRecorder::new(Arc::clone(&sink), Arc::clone(&exclusions))),
        Arc::new(ResponseRecorder::new(sink, exclusions)),
    ]
}
