//! HTTP trigger server.
//!
//! `HttpTrigger` runs a hyper HTTP/1.1 server and hands every request to a
//! handler callback, one tokio task per connection.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Callback type for handling HTTP requests.
pub type RequestHandler = Arc<dyn Fn(Request<Incoming>) -> HandlerFuture + Send + Sync>;

pub type HandlerFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = anyhow::Result<Response<Full<Bytes>>>> + Send>,
>;

pub struct HttpTrigger {
    bind_addr: SocketAddr,
    handler: RequestHandler,
}

impl HttpTrigger {
    pub fn new(bind_addr: SocketAddr, handler: RequestHandler) -> Self {
        Self { bind_addr, handler }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Bind and serve until the shutdown signal is received.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("failed to bind HTTP trigger to {}", self.bind_addr))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is
    /// received. Connections already accepted run to completion on their
    /// own tasks.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let local_addr = listener.local_addr().context("listener has no local address")?;
        info!(addr = %local_addr, "HTTP trigger listening");

        let mut accepted: u64 = 0;
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = match accept_result {
                        Ok(conn) => conn,
                        Err(e) => {
                            // EMFILE and friends are transient.
                            warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    accepted += 1;
                    tokio::spawn(serve_connection(stream, peer_addr, self.handler.clone()));
                }
                _ = shutdown.changed() => {
                    info!(accepted, "HTTP trigger shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Drive one HTTP/1.1 connection. A handler error becomes a 500 for that
/// request only.
async fn serve_connection(stream: TcpStream, peer_addr: SocketAddr, handler: RequestHandler) {
    debug!(%peer_addr, "connection opened");
    let svc = service_fn(move |req: Request<Incoming>| {
        let handler = handler.clone();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        async move {
            let response = match handler(req).await {
                Ok(response) => response,
                Err(e) => {
                    error!(%peer_addr, %method, %path, error = %e, "request handler failed");
                    internal_error()
                }
            };
            Ok::<_, hyper::Error>(response)
        }
    });

    match http1::Builder::new()
        .serve_connection(TokioIo::new(stream), svc)
        .await
    {
        Ok(()) => debug!(%peer_addr, "connection closed"),
        Err(e) if e.is_incomplete_message() => {
            debug!(%peer_addr, "client closed the connection mid-request")
        }
        Err(e) => error!(%peer_addr, error = %e, "connection error"),
    }
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
