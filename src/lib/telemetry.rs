//! Telemetry initialization and tool invocation span helpers.

use std::time::Instant;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Log line format written to stderr.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Initialize `tracing`. Logs always go to stderr so stdio stays free for the protocol.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_thread_ids(true).with_file(true).try_init(),
    };
    installed.map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper to record start and finish of a tool invocation.
pub struct InvocationSpan {
    span: Span,
    started_at: Instant,
    invocation_id: Uuid,
}

impl InvocationSpan {
    /// Start an invocation span.
    pub fn start(invocation_id: Uuid, tool: &str) -> Self {
        let span = info_span!(
            target: "chatapp_mcp::tools",
            "tool_invocation",
            %invocation_id,
            tool
        );
        Self {
            span,
            started_at: Instant::now(),
            invocation_id,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Close the span while recording the outcome.
    pub fn finish(self, status: &'static str, is_error: bool) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "chatapp_mcp::tools",
            invocation_id = %self.invocation_id,
            status = status,
            is_error = is_error,
            elapsed_ms = elapsed_ms,
            "Completed tool invocation"
        );
    }
}

/// Payload for logging MCP runtime state as structured telemetry.
#[derive(Debug, Serialize)]
pub struct RuntimeModeTelemetry<'a> {
    pub transport: &'a str,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub mcp_url: &'a str,
    pub config_path: &'a str,
    pub tools: usize,
    pub resources: usize,
    pub shutdown_grace_secs: u64,
    pub launch_args: &'a [String],
}

/// Emit runtime mode to `tracing`.
pub fn emit_runtime_mode(telemetry: &RuntimeModeTelemetry<'_>) {
    info!(
        target: "chatapp_mcp::runtime",
        transport = telemetry.transport,
        host = telemetry.host.unwrap_or(""),
        port = telemetry.port.unwrap_or_default(),
        mcp_url = telemetry.mcp_url,
        config_path = telemetry.config_path,
        tools = telemetry.tools,
        resources = telemetry.resources,
        shutdown_grace_secs = telemetry.shutdown_grace_secs,
        launch_args = ?telemetry.launch_args,
        "Starting MCP server"
    );
}
