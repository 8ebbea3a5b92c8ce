//! HTTP server and graceful shutdown.
//!
//! Every accepted connection runs in its own task. By default there is no
//! cap on how many run at once; [`Server::max_connections`] adds one.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops calling `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

use crate::context::Context;
use crate::error::Error;
use crate::middleware::Pipeline;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: String,
    max_connections: Option<usize>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is validated there.
    ///
    /// ```rust,no_run
    /// use weft::Server;
    /// let server = Server::bind("0.0.0.0:3000").max_connections(1024);
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self { addr: addr.to_owned(), max_connections: None }
    }

    /// Caps concurrently served connections. Further connections wait in the
    /// listen backlog until a slot frees up.
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.max_connections = Some(limit);
        self
    }

    /// Starts accepting connections and running each request through `app`.
    ///
    /// Returns only after a graceful shutdown (SIGTERM or Ctrl-C, followed
    /// by all in-flight connections completing).
    pub async fn serve(self, app: impl Into<Pipeline>) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `shutdown`
    /// resolves instead of on a process signal.
    pub async fn serve_with_shutdown(
        self,
        app: impl Into<Pipeline>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|_| Error::Addr(self.addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;

        let app = Arc::new(app.into());
        let limiter = self.max_connections.map(|n| Arc::new(Semaphore::new(n)));

        info!(%addr, max_connections = ?self.max_connections, "weft listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a SIGTERM stops accepting even when more
                // connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = accept(&listener, limiter.clone()) => {
                    let (stream, remote_addr, permit) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Held for the lifetime of the connection.
                        let _permit = permit;

                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("weft stopped");
        Ok(())
    }
}

/// Waits for a connection slot (if limited), then for a connection.
async fn accept(
    listener: &TcpListener,
    limiter: Option<Arc<Semaphore>>,
) -> std::io::Result<(TcpStream, SocketAddr, Option<OwnedSemaphorePermit>)> {
    let permit = match limiter {
        Some(sem) => sem.acquire_owned().await.ok(),
        None => None,
    };
    let (stream, addr) = listener.accept().await?;
    Ok((stream, addr, permit))
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the pipeline and produces one response.
///
/// Infallible towards hyper: body read failures become 400, faults that no
/// [`ErrorBoundary`](crate::middleware::ErrorBoundary) caught become 500, and
/// an unsent context is finalized by [`Context::finish`].
async fn dispatch(
    app: Arc<Pipeline>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let mut cx = Context::new(parts.method, parts.uri, parts.headers, body)
        .with_remote_addr(remote_addr);

    if let Err(e) = app.execute(&mut cx).await {
        error!(peer = %remote_addr, path = %cx.path(), "unhandled fault: {e}");
        return Ok(Response::status(StatusCode::INTERNAL_SERVER_ERROR).into_inner());
    }

    Ok(cx.finish().into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). A handler that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
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
