//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` before sending SIGKILL. The server then:
//!
//! 1. Stops accepting new connections.
//! 2. Lets every in-flight connection task run to completion, so their
//!    summary records still get written.
//! 3. Returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Error;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // One router, middleware stack included, shared by every connection
        // task. Stages hold only `Arc`s, so sharing needs no locks.
        let router = Arc::new(router);

        info!(addr = %self.addr, "trailmark listening");

        // Every connection task lands here so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        // `select!` polls the same shutdown future on every iteration, so it
        // has to stay put in memory: `tokio::pin!` pins it on the stack.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` polls the arms top to bottom. Shutdown comes first,
                // so a SIGTERM stops the accept loop even with a queued backlog.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    // Bridges tokio's AsyncRead/AsyncWrite to hyper's IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // The closure runs once per request, not once per
                        // connection: keep-alive connections carry many.
                        let svc = service_fn(move |req| dispatch(Arc::clone(&router), req));

                        // HTTP/1.1 or HTTP/2, whichever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set stays bounded on a long-lived
                // server.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain. Each in-flight request still runs its whole chain, summary
        // record included, before `serve` returns.
        while tasks.join_next().await.is_some() {}

        info!("trailmark stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Hands one hyper request to the router.
///
/// The error type is [`Infallible`]: unmatched routes, broken bodies and
/// failed writes all end up as a response or a log line inside
/// [`Router::handle`], so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    Ok(router.handle(req).await)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal.
///
/// On Unix that is **SIGTERM** (Kubernetes, `docker stop`) or **SIGINT**
/// (Ctrl-C during local runs). Elsewhere only Ctrl-C is available. A signal
/// handler that cannot be installed is logged and never fires; the server
/// keeps running on the other one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
