//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. The router also owns the
//! middleware stack and runs every request through it, matched or not.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;

use crate::context::Context;
use crate::error::BoxError;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{self, ExclusionPolicy, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::sink::Sink;
use crate::writer::HttpResponseWriter;

struct Route {
    /// The template as registered, reported as the request's route path.
    path: Arc<str>,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    stack: Vec<Arc<dyn Middleware>>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            stack: Vec::new(),
            fallback: not_found.into_boxed_handler(),
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Parameters may be written `:name` or `{name}`, catch-alls `*name` or
    /// `{*name}`; `req.param("name")` retrieves them either way:
    ///
    /// ```rust
    /// # use trailmark::{Method, Request, Response, Router};
    /// # async fn get_order(_: Request) -> Response { Response::text("") }
    /// # async fn create_order(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/orders/:id", get_order)
    ///     .on(Method::POST, "/orders",     create_order);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an earlier route.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let route = Route { path: Arc::from(path), handler: handler.into_boxed_handler() };
        self.routes
            .entry(method)
            .or_default()
            .insert(matchit_syntax(path), route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Appends a middleware stage. Stages run in the order they are added,
    /// the first one outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.stack.push(Arc::new(middleware));
        self
    }

    /// Installs the access-log pipeline: correlation id, summary line, and
    /// request/response records, all writing to `sink`.
    pub fn observe(mut self, sink: Arc<dyn Sink>, exclusions: ExclusionPolicy) -> Self {
        self.stack.extend(middleware::observability(sink, exclusions));
        self
    }

    /// Runs one request through the middleware stack and its handler.
    ///
    /// Unmatched requests still pass through the stack, with an empty route
    /// path, and end in a `404 Not Found`.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let request = Request::from_http(req);
        let (endpoint, request) = match self.lookup(request.method(), request.path()) {
            Some((handler, path, params)) => (handler, request.with_route(path, params)),
            None => (Arc::clone(&self.fallback), request),
        };

        let mut ctx = Context::new(request);
        let mut writer = HttpResponseWriter::new();
        Next::new(&self.stack, &endpoint).run(&mut ctx, &mut writer).await;
        writer.into_response()
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, Arc<str>, HashMap<String, String>)> {
        let matched = self.routes.get(method)?.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((Arc::clone(&matched.value.handler), Arc::clone(&matched.value.path), params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

async fn not_found(_req: Request) -> Response {
    Response::status(StatusCode::NOT_FOUND)
}

/// Rewrites `:name` / `*name` segments into matchit's `{name}` / `{*name}`.
fn matchit_syntax(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn request(method: Method, uri: &str) -> http::Request<Full<Bytes>> {
        http::Request::builder().method(method).uri(uri).body(Full::new(Bytes::new())).unwrap()
    }

    async fn body(res: http::Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    async fn describe(req: Request) -> Response {
        Response::text(format!("{} {}", req.route(), req.param("id").unwrap_or("-")))
    }

    #[test]
    fn rewrites_colon_params() {
        assert_eq!(matchit_syntax("/orders/:id"), "/orders/{id}");
        assert_eq!(matchit_syntax("/files/*path"), "/files/{*path}");
        assert_eq!(matchit_syntax("/orders/{id}/items"), "/orders/{id}/items");
        assert_eq!(matchit_syntax("/"), "/");
    }

    #[tokio::test]
    async fn reports_the_registered_template() {
        let app = Router::new()
            .get("/orders/:id", describe)
            .get("/users/{id}", describe);

        let res = app.handle(request(Method::GET, "/orders/42")).await;
        assert_eq!(body(res).await, Bytes::from("/orders/:id 42"));

        let res = app.handle(request(Method::GET, "/users/7")).await;
        assert_eq!(body(res).await, Bytes::from("/users/{id} 7"));
    }

    #[tokio::test]
    async fn unknown_routes_and_methods_get_404() {
        let app = Router::new().get("/orders/:id", describe);

        let res = app.handle(request(Method::GET, "/nope")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app.handle(request(Method::DELETE, "/orders/42")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = Router::new()
            .get("/orders/:id", describe)
            .get("/orders/:order", describe);
    }
}
