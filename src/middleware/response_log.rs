//! Outbound response record.

use std::sync::Arc;

use super::{BoxFuture, ExclusionPolicy, Middleware, Next, correlation_id};
use crate::context::Context;
use crate::sink::{Level, Record, Sink, fields};
use crate::writer::{BodyCapturingWriter, ResponseWriter};

/// Message of the record this stage emits.
pub const RESPONSE_INFORMATION: &str = "response_information";

/// Emits one `response_information` record at `Debug` with the response body
/// and final status.
///
/// Inactive unless the sink is at `Debug`; then the writer handed downstream
/// is a [`BodyCapturingWriter`] over the one this stage received.
pub struct ResponseRecorder {
    sink: Arc<dyn Sink>,
    exclusions: Arc<ExclusionPolicy>,
}

impl ResponseRecorder {
    pub fn new(sink: Arc<dyn Sink>, exclusions: Arc<ExclusionPolicy>) -> Self {
        Self { sink, exclusions }
    }
}

impl Middleware for ResponseRecorder {
    fn name(&self) -> &'static str {
        "response_recorder"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        writer: &'a mut dyn ResponseWriter,
        next: Next<'a>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if !self.sink.level().is_detailed() || self.exclusions.is_excluded(ctx.request().route()) {
                return next.run(ctx, writer).await;
            }

            let mut capture = BodyCapturingWriter::new(writer);
            next.run(&mut *ctx, &mut capture).await;

            let status = capture.status();
            let body = capture.into_captured();
            self.sink.emit(
                Record::new(Level::Debug, RESPONSE_INFORMATION)
                    .with(fields::XID, correlation_id(ctx.request()).unwrap_or_default())
                    .with(fields::BODY, String::from_utf8_lossy(&body).into_owned())
                    .with(fields::STATUS, status.as_u16()),
            );
        })
    }
}
