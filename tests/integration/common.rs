use std::{io, path::PathBuf, process::Stdio};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf},
    process::{Child, ChildStdin, ChildStdout, Command},
    task::JoinHandle,
};

use chatapp_mcp::server::{
    config::{EndpointsSection, ServerConfig, ServerSection, ToolsSection},
    context::AppContext,
    runtime::McpHost,
};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_chatapp-mcp");

/// Spawn the binary in stdio mode; stderr is drained into the returned task.
pub async fn spawn_server_process(
    config_fixture: &str,
) -> Result<(Child, ChildIoBridge, Option<JoinHandle<String>>)> {
    let mut command = Command::new(BINARY_PATH);
    command
        .args(["--transport", "stdio", "--log-format", "text"])
        .env("CHATAPP_CONFIG_PATH", fixture(config_fixture))
        .stdout(Stdio::piped())
        .stdin(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().context("failed to spawn server process")?;
    let stdout = child.stdout.take().expect("child stdout");
    let stdin = child.stdin.take().expect("child stdin");
    let bridge = ChildIoBridge::new(stdout, stdin);
    let stderr_handle = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        })
    });
    Ok((child, bridge, stderr_handle))
}

pub fn fixture(relative: &str) -> String {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.join(relative).display().to_string()
}

pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        server: ServerSection {
            host: "127.0.0.1".into(),
            port: 8787,
            mcp_path: "/mcp".into(),
            shutdown_grace_secs: 5,
            log_requests: true,
        },
        endpoints: EndpointsSection {
            public_url: "https://app.example.com".into(),
            auth_issuer_url: "https://auth.example.com".into(),
            session_store_url: "redis://127.0.0.1:6379".into(),
            session_key_prefix: "chatgptapp:".into(),
        },
        tools: ToolsSection::default(),
        source_path: PathBuf::from("tests/fixtures/config_valid.toml"),
    }
}

pub fn build_host(context: &AppContext) -> McpHost {
    let capabilities =
        chatapp_mcp::tools::build_capabilities().expect("capabilities should build");
    McpHost::new(capabilities, context.clone())
}

pub struct ChildIoBridge {
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl ChildIoBridge {
    pub fn new(stdout: ChildStdout, stdin: ChildStdin) -> Self {
        Self { stdout, stdin }
    }
}

impl AsyncRead for ChildIoBridge {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for ChildIoBridge {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        data: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        std::pin::Pin::new(&mut self.stdin).poll_write(cx, data)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}
