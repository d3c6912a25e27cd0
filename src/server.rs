//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection finish, then returns from [`Server::serve`].
//!
//! Request bodies are read in full before dispatch, up to
//! [`Server::max_body_size`] bytes. A larger body is answered with a 413.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::api_error::{ApiError, BoxError};
use crate::app::App;
use crate::config::{DEFAULT_MAX_BODY_SIZE, Settings};
use crate::error::Error;

/// The HTTP server.
#[derive(Debug, Clone, Copy)]
pub struct Server {
    addr: SocketAddr,
    max_body_size: usize,
}

impl Server {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, max_body_size: DEFAULT_MAX_BODY_SIZE }
    }

    /// Parses `addr` as `host:port`.
    ///
    /// ```rust
    /// use truss::Server;
    /// let server = Server::bind("0.0.0.0:5000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        addr.parse()
            .map(Self::new)
            .map_err(|source| Error::Addr { addr: addr.to_owned(), source })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        Ok(Self::bind(&settings.server.bind)?.max_body_size(settings.server.max_body_size))
    }

    /// Largest request body accepted, in bytes. Defaults to 1 MiB.
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts connections and dispatches them through `app`.
    ///
    /// Returns after a full graceful shutdown.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let app = Arc::new(app);

        info!(addr = %self.addr, debug = app.is_debug(), "truss listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even with a backlog.
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

                    let app = Arc::clone(&app);
                    let limit = self.max_body_size;
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, remote_addr, limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set does not grow unbounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("truss stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Collects the body and hands the request to the app. Failures become
/// responses, so hyper never sees an error.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    limit: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let span = info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
        peer = %remote_addr,
    );

    async move {
        let (parts, body) = req.into_parts();
        let response = match read_body(body, limit).await {
            Ok(bytes) => app.handle(parts.method, &parts.uri, parts.headers, bytes).await,
            Err(e) => {
                warn!(status = e.status().as_u16(), "failed to read request body: {e}");
                e.render(app.is_debug())
            }
        };
        Ok(response.into_inner())
    }
    .instrument(span)
    .await
}

/// Reads at most `limit` bytes. Over the limit is a 413; a body that fails
/// mid-stream is a 400.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            Err(ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").with_source(e))
        }
        Err(e) => Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body").with_source(e)),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A handler that cannot be
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
