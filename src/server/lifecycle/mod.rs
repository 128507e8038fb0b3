//! Process lifecycle: run a listener, wait for a stop trigger, shut down within a grace period.
pub mod listener;
pub mod signal;

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::watch, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use listener::{HttpListener, Listener, StdioListener};

use crate::{
    lib::errors::{LifecycleError, ListenerError},
    server::context::AppContext,
};

/// Lifecycle phases. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl LifecycleState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
        }
    }
}

/// What moved the manager out of `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The process shutdown token was cancelled (signal or explicit request).
    Signal,
    /// The listener finished on its own, e.g. the stdio peer closed.
    ListenerClosed,
    /// The listener reported a fatal error.
    ListenerFailed,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ShutdownTrigger::Signal => "signal",
            ShutdownTrigger::ListenerClosed => "listener_closed",
            ShutdownTrigger::ListenerFailed => "listener_failed",
        };
        f.write_str(reason)
    }
}

/// Summary of a clean run.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub trigger: ShutdownTrigger,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
}

/// Drives `Starting -> Running -> ShuttingDown -> Stopped` around a listener.
pub struct LifecycleManager {
    shutdown: CancellationToken,
    grace: Duration,
    state: watch::Sender<LifecycleState>,
}

impl LifecycleManager {
    pub fn new(shutdown: CancellationToken, grace: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            shutdown,
            grace,
            state,
        }
    }

    pub fn from_context(context: &AppContext) -> Self {
        Self::new(
            context.shutdown_token(),
            context.config().server.shutdown_grace(),
        )
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    fn advance(&self, next: LifecycleState) {
        let moved = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if moved {
            info!(
                target: "chatapp_mcp::lifecycle",
                state = next.as_str(),
                "Lifecycle state changed"
            );
        }
    }

    /// Serve until a stop trigger, then shut the listener down within the grace period.
    ///
    /// Runs once; the manager ends in `Stopped` whatever the outcome.
    pub async fn run<L: Listener>(
        &self,
        listener: Arc<L>,
    ) -> Result<ShutdownReport, LifecycleError> {
        let started_at = Utc::now();
        let serving = Arc::clone(&listener);
        let mut serve_task = tokio::spawn(async move { serving.serve().await });
        self.advance(LifecycleState::Running);
        info!(
            target: "chatapp_mcp::lifecycle",
            transport = listener.transport(),
            "Server started"
        );

        let (trigger, listener_error) = tokio::select! {
            _ = self.shutdown.cancelled() => (ShutdownTrigger::Signal, None),
            joined = &mut serve_task => match joined {
                Ok(Ok(())) => (ShutdownTrigger::ListenerClosed, None),
                Ok(Err(err)) => (ShutdownTrigger::ListenerFailed, Some(err)),
                Err(join_err) => (
                    ShutdownTrigger::ListenerFailed,
                    Some(ListenerError::Panicked { message: join_err.to_string() }),
                ),
            },
        };
        self.advance(LifecycleState::ShuttingDown);
        self.shutdown.cancel();
        if let Some(err) = &listener_error {
            error!(
                target: "chatapp_mcp::lifecycle",
                error = %err,
                "Listener failed"
            );
        }
        info!(
            target: "chatapp_mcp::lifecycle",
            reason = %trigger,
            grace_secs = self.grace.as_secs(),
            "Shutting down server"
        );

        let deadline = time::Instant::now() + self.grace;
        let shutdown = time::timeout_at(deadline, listener.shutdown(deadline)).await;
        serve_task.abort();
        self.advance(LifecycleState::Stopped);

        match shutdown {
            Err(_elapsed) => {
                let err = LifecycleError::ShutdownTimeout {
                    grace_secs: self.grace.as_secs(),
                };
                error!(target: "chatapp_mcp::lifecycle", error = %err, "Server forced to shut down");
                Err(err)
            }
            Ok(Err(err)) => {
                error!(target: "chatapp_mcp::lifecycle", error = %err, "Server forced to shut down");
                Err(LifecycleError::ShutdownFailed(err))
            }
            Ok(Ok(())) => match listener_error {
                Some(err) => {
                    warn!(
                        target: "chatapp_mcp::lifecycle",
                        "Server stopped after a listener failure"
                    );
                    Err(LifecycleError::Transport(err))
                }
                None => {
                    info!(target: "chatapp_mcp::lifecycle", "Server exited properly");
                    Ok(ShutdownReport {
                        trigger,
                        started_at,
                        stopped_at: Utc::now(),
                    })
                }
            },
        }
    }
}
