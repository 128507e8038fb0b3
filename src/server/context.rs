//! Process-wide state handed explicitly to every component.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::server::config::ServerConfig;

/// Shutdown token plus the loaded configuration.
///
/// Cancelling the token is the only teardown mechanism: the lifecycle manager
/// watches it, and every tool invocation observes it through its `ToolContext`.
#[derive(Debug, Clone)]
pub struct AppContext {
    shutdown: CancellationToken,
    config: Arc<ServerConfig>,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            shutdown: CancellationToken::new(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request process shutdown. Idempotent.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
