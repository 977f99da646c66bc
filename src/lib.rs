//! # trailmark
//!
//! Request-scoped access logging for HTTP services behind a reverse proxy.
//!
//! Every request that passes through the [`Router`] gets a correlation id
//! (taken from `X-Request-ID` or freshly generated) and, depending on the
//! sink's [`Level`], up to three structured records:
//!
//! - **`request_information`** (debug): method, route path, headers, body.
//! - **`response_information`** (debug): status and the exact bytes written.
//! - **`api_summary`** (info): method, route path, status, latency.
//!
//! Records go to a [`Sink`]. [`TracingSink`] forwards them to `tracing`;
//! [`MemorySink`] keeps them for tests. Neither capture changes what the
//! handler reads or what the client receives. Health probes and any other
//! prefix in the [`ExclusionPolicy`](middleware::ExclusionPolicy) are skipped.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use trailmark::middleware::ExclusionPolicy;
//! use trailmark::{Request, Response, Router, Server, StatusCode, TracingSink, health};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/orders/:id", get_order)
//!         .post("/orders", create_order)
//!         .get(health::LIVENESS, health::liveness)
//!         .observe(Arc::new(TracingSink::from_current()), ExclusionPolicy::default());
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_order(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_order(mut req: Request) -> Response {
//!     match req.bytes().await {
//!         Ok(body) if !body.is_empty() => Response::builder()
//!             .status(StatusCode::CREATED)
//!             .json(body.to_vec()),
//!         _ => Response::status(StatusCode::BAD_REQUEST),
//!     }
//! }
//! ```

mod context;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod sink;
mod writer;

pub mod health;
pub mod middleware;

pub use context::Context;
pub use error::{BoxError, Error};
pub use handler::Handler;
pub use request::{Body, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use sink::{Field, Level, MemorySink, ParseLevelError, Record, Sink, TracingSink, Value, fields};
pub use writer::{BodyCapturingWriter, HttpResponseWriter, ResponseWriter};

pub use http::{Method, StatusCode};
