//! Transport listeners driven by the lifecycle manager.
use std::{future::Future, net::SocketAddr, sync::Mutex};

use axum::Router;
use rmcp::{
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ServiceExt,
};
use tokio::{net::TcpListener, sync::watch, time::Instant};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{lib::errors::ListenerError, server::runtime::McpHost};

/// Something that accepts MCP traffic until told to stop.
///
/// `serve` runs until the listener closes or fails. `shutdown` stops accepting
/// new work and resolves once in-flight work has drained; the caller bounds it
/// with the grace deadline.
pub trait Listener: Send + Sync + 'static {
    fn transport(&self) -> &'static str;

    fn serve(&self) -> impl Future<Output = Result<(), ListenerError>> + Send;

    fn shutdown(&self, deadline: Instant) -> impl Future<Output = Result<(), ListenerError>> + Send;
}

/// Streamable HTTP listener mounted at the configured MCP path.
pub struct HttpListener {
    local_addr: SocketAddr,
    pending: Mutex<Option<(TcpListener, Router)>>,
    stop: CancellationToken,
    finished: watch::Sender<bool>,
}

impl HttpListener {
    /// Bind `addr` and mount the MCP service at the host's configured `server.mcp_path`.
    pub async fn bind(addr: &str, host: McpHost) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ListenerError::LocalAddr)?;
        let server = &host.context().config().server;
        let mcp_path = server.mcp_path.clone();
        let log_requests = server.log_requests;
        let router = mcp_router(&mcp_path, log_requests, host);
        let (finished, _) = watch::channel(false);

        info!(
            target: "chatapp_mcp::listener",
            transport = "http",
            bind_addr = %local_addr,
            mcp_path = %mcp_path,
            log_requests,
            "Listening for streamable HTTP connections"
        );

        Ok(Self {
            local_addr,
            pending: Mutex::new(Some((listener, router))),
            stop: CancellationToken::new(),
            finished,
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn take_pending(&self) -> Option<(TcpListener, Router)> {
        match self.pending.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Route MCP traffic at `mcp_path`; the root path takes every request.
fn mcp_router(mcp_path: &str, log_requests: bool, host: McpHost) -> Router {
    // Each request gets a fresh handler, so no response stream outlives its request.
    let config = StreamableHttpServerConfig {
        stateful_mode: false,
        ..Default::default()
    };
    let service = StreamableHttpService::new(
        move || Ok(host.clone()),
        LocalSessionManager::default().into(),
        config,
    );
    let router = if mcp_path == "/" {
        Router::new().fallback_service(service)
    } else {
        Router::new().nest_service(mcp_path, service)
    };
    if log_requests {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

impl Listener for HttpListener {
    fn transport(&self) -> &'static str {
        "http"
    }

    async fn serve(&self) -> Result<(), ListenerError> {
        let (listener, router) = self.take_pending().ok_or(ListenerError::AlreadyStarted)?;
        let stop = self.stop.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .map_err(|source| ListenerError::Serve {
                addr: self.local_addr,
                source,
            });
        self.finished.send_replace(true);
        result
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ListenerError> {
        self.stop.cancel();
        if self.take_pending().is_some() {
            // Never served; dropping the socket is enough.
            return Ok(());
        }
        debug!(
            target: "chatapp_mcp::listener",
            remaining_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64,
            "Waiting for HTTP connections to drain"
        );
        let mut finished = self.finished.subscribe();
        finished
            .wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| ListenerError::Transport {
                transport: "http",
                message: "listener dropped before draining".into(),
            })
    }
}

/// Single-peer listener over the process's stdin/stdout.
pub struct StdioListener {
    host: Mutex<Option<McpHost>>,
    stop: CancellationToken,
    finished: watch::Sender<bool>,
}

impl StdioListener {
    pub fn new(host: McpHost) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            host: Mutex::new(Some(host)),
            stop: CancellationToken::new(),
            finished,
        }
    }

    fn take_host(&self) -> Option<McpHost> {
        match self.host.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Listener for StdioListener {
    fn transport(&self) -> &'static str {
        "stdio"
    }

    async fn serve(&self) -> Result<(), ListenerError> {
        let host = self.take_host().ok_or(ListenerError::AlreadyStarted)?;
        info!(
            target: "chatapp_mcp::listener",
            transport = "stdio",
            "Serving MCP over stdio"
        );
        let transport_error = |message: String| ListenerError::Transport {
            transport: "stdio",
            message,
        };
        let result = match host
            .serve_with_ct(rmcp::transport::stdio(), self.stop.clone())
            .await
        {
            Ok(running) => match running.waiting().await {
                Ok(reason) => {
                    debug!(
                        target: "chatapp_mcp::listener",
                        reason = ?reason,
                        "stdio session ended"
                    );
                    Ok(())
                }
                Err(err) => Err(transport_error(err.to_string())),
            },
            Err(err) => Err(transport_error(err.to_string())),
        };
        self.finished.send_replace(true);
        result
    }

    async fn shutdown(&self, _deadline: Instant) -> Result<(), ListenerError> {
        self.stop.cancel();
        if self.take_host().is_some() {
            return Ok(());
        }
        let mut finished = self.finished.subscribe();
        finished
            .wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| ListenerError::Transport {
                transport: "stdio",
                message: "listener dropped before draining".into(),
            })
    }
}
