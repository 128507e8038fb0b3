use std::{process::ExitCode, sync::Arc};

use anyhow::Error;

use crate::{
    cli::{LaunchProfile, TransportMode},
    lib::{
        errors::{ConfigError, LifecycleError, ListenerError, RegistrationError},
        telemetry::{emit_runtime_mode, RuntimeModeTelemetry},
    },
    server::{
        config::ServerConfig,
        context::AppContext,
        lifecycle::{signal, HttpListener, LifecycleManager, Listener, StdioListener},
        runtime::McpHost,
    },
    tools,
};

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_REGISTRATION: u8 = 3;
pub const EXIT_LISTENER: u8 = 4;
pub const EXIT_TRANSPORT: u8 = 5;
pub const EXIT_SHUTDOWN_FAILED: u8 = 6;
pub const EXIT_SHUTDOWN_TIMEOUT: u8 = 7;

/// Bundles a runtime error message with the process exit code it maps to.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    code: u8,
}

impl RuntimeExit {
    pub fn with_code(err: impl Into<Error>, code: u8) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:#}"),
            code,
        }
    }

    /// Classify an arbitrary error by its root type.
    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        let code = if err.downcast_ref::<ConfigError>().is_some() {
            EXIT_CONFIG
        } else if err.downcast_ref::<RegistrationError>().is_some() {
            EXIT_REGISTRATION
        } else {
            EXIT_FAILURE
        };
        Self::with_code(err, code)
    }

    /// The listener could not be constructed (bind failure and the like).
    pub fn listener(err: ListenerError) -> Self {
        Self::with_code(err, EXIT_LISTENER)
    }

    pub fn report(self) -> ExitCode {
        tracing::error!(
            target: "chatapp_mcp::runtime",
            exit_code = self.code,
            reason = %self.message,
            "Server exiting with failure"
        );
        eprintln!("{}", self.message);
        ExitCode::from(self.code)
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code)
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LifecycleError> for RuntimeExit {
    fn from(err: LifecycleError) -> Self {
        let code = match &err {
            LifecycleError::Transport(_) => EXIT_TRANSPORT,
            LifecycleError::ShutdownFailed(_) => EXIT_SHUTDOWN_FAILED,
            LifecycleError::ShutdownTimeout { .. } => EXIT_SHUTDOWN_TIMEOUT,
        };
        Self::with_code(err, code)
    }
}

/// Build capabilities, bind the selected transport and run it until shutdown.
pub async fn run_server(profile: LaunchProfile, config: ServerConfig) -> Result<(), RuntimeExit> {
    let capabilities = tools::build_capabilities().map_err(RuntimeExit::from_error)?;
    let context = AppContext::new(config);
    let host = McpHost::new(Arc::clone(&capabilities), context.clone());

    let config = context.config();
    let mcp_url = config.mcp_url();
    let is_http = profile.transport == TransportMode::Http;
    emit_runtime_mode(&RuntimeModeTelemetry {
        transport: profile.transport.as_str(),
        host: is_http.then_some(config.server.host.as_str()),
        port: is_http.then_some(config.server.port),
        mcp_url: &mcp_url,
        config_path: config.source_path.to_string_lossy().as_ref(),
        tools: capabilities.tool_count(),
        resources: capabilities.resource_count(),
        shutdown_grace_secs: config.server.shutdown_grace_secs,
        launch_args: &profile.launch_args,
    });

    let manager = LifecycleManager::from_context(&context);
    let signals = signal::install(context.shutdown_token());
    let outcome = match profile.transport {
        TransportMode::Http => {
            let listener = HttpListener::bind(&config.server.bind_addr(), host)
                .await
                .map_err(RuntimeExit::listener);
            match listener {
                Ok(listener) => run_listener(&manager, listener).await,
                Err(exit) => Err(exit),
            }
        }
        TransportMode::Stdio => run_listener(&manager, StdioListener::new(host)).await,
    };
    signals.abort();
    outcome
}

async fn run_listener<L: Listener>(
    manager: &LifecycleManager,
    listener: L,
) -> Result<(), RuntimeExit> {
    let report = manager.run(Arc::new(listener)).await?;
    tracing::info!(
        target: "chatapp_mcp::runtime",
        trigger = %report.trigger,
        uptime_ms = (report.stopped_at - report.started_at).num_milliseconds(),
        "Server stopped"
    );
    Ok(())
}
