//! Order endpoints with the full access-log pipeline.
//!
//! Run with:
//!   TRAILMARK_LOG_LEVEL=debug cargo run --example basic
//!
//! Try:
//!   curl -H 'x-request-id: abc-123' http://localhost:3000/orders/42
//!   curl -X POST http://localhost:3000/orders \
//!        -H 'content-type: application/json' \
//!        -d '{"item":"book"}'
//!   curl http://localhost:3000/liveness      # not logged

use std::sync::Arc;

use trailmark::middleware::ExclusionPolicy;
use trailmark::{Level, Request, Response, Router, Server, StatusCode, TracingSink, health};

#[tokio::main]
async fn main() {
    let level = Level::from_env();
    let max = if level.is_detailed() { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(max).init();

    let app = Router::new()
        .get("/orders/:id",    get_order)
        .post("/orders",       create_order)
        .delete("/orders/:id", delete_order)
        .get(health::LIVENESS,  health::liveness)
        .get(health::READINESS, health::readiness)
        .observe(Arc::new(TracingSink::new(level)), ExclusionPolicy::default());

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /orders/:id
async fn get_order(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","item":"book"}}"#).into_bytes())
}

// POST /orders
//
// The request recorder already read the body; the handler still gets all of it.
async fn create_order(mut req: Request) -> Response {
    let body = match req.bytes().await {
        Ok(body) if !body.is_empty() => body,
        _ => return Response::status(StatusCode::BAD_REQUEST),
    };

    let parsed: Result<serde_json::Value, _> = serde_json::from_slice(&body);
    if parsed.is_err() {
        return Response::status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/orders/99")
        .json(body.to_vec())
}

// DELETE /orders/:id → 204 No Content
async fn delete_order(_req: Request) -> Response {
    Response::status(StatusCode::NO_CONTENT)
}
