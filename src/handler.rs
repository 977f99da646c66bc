//! Handler trait and type erasure.
//!
//! Routes hold handlers of different concrete types in one table, so each is
//! boxed behind [`ErasedHandler`] at registration time:
//!
//! ```text
//! async fn get_order(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/orders/:id", get_order)
//! get_order.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_order))                       ← stored as BoxedHandler
//!        ↓ end of the middleware chain
//! handler.call(req) → BoxFuture<'static, Response>
//! ```
//!
//! Per request that costs one `Arc` clone and one virtual call.

use std::future::Future;
use std::sync::Arc;

use crate::middleware::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// Object-safe calling interface behind every route.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)`: it shows up in the return
/// type of [`Handler::into_boxed_handler`], which is public.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;
}

/// A type-erased handler shared across concurrent requests.
///
/// The router clones the `Arc` once per request, at the end of the
/// middleware chain; the handler itself is never copied.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the shape:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** through the private `Sealed` supertrait, so the
/// blanket impl below is the only way to satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// `Sealed` cannot be named outside this module, so other crates cannot
/// implement [`Handler`] for their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

/// `Fn(Request) -> Fut` covers named `async fn` items, closures returning a
/// future, and any type that implements `Fn`.
impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`] for it.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        // Start the call outside the box so only the returned future is
        // allocated; `into_response` runs once it resolves.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
