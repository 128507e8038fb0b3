use std::{sync::Arc, time::Duration};

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Notify,
    task::JoinHandle,
    time::timeout,
};

use chatapp_mcp::{
    capabilities::{
        tool_with_output, CapabilityRegistry, ServerIdentity, Session, ToolContext, ToolRequest,
        ToolResponseWriter,
    },
    lib::errors::{HandlerError, LifecycleError},
    server::{
        context::AppContext,
        lifecycle::{HttpListener, LifecycleManager, LifecycleState, ShutdownTrigger},
        runtime::McpHost,
    },
};

use crate::common::{build_host, test_server_config};

async fn status_line(addr: std::net::SocketAddr, request: &str) -> Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(request.as_bytes()).await?;
    let mut received = Vec::new();
    let mut buf = [0u8; 512];
    while !received.windows(2).any(|pair| pair == b"\r\n") {
        let read = timeout(Duration::from_secs(5), stream.read(&mut buf)).await??;
        if read == 0 {
            break;
        }
        received.extend_from_slice(&buf[..read]);
    }
    let text = String::from_utf8_lossy(&received);
    Ok(text.lines().next().unwrap_or_default().to_string())
}

fn initialize_request(path: &str) -> String {
    let body = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{},"clientInfo":{"name":"http-client","version":"0.0.1"}}}"#;
    format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nAccept: application/json, text/event-stream\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n{body}",
        len = body.len()
    )
}

#[tokio::test]
async fn http_server_serves_mcp_path_and_stops_on_signal() -> Result<()> {
    let context = AppContext::new(test_server_config());
    let listener = Arc::new(HttpListener::bind("127.0.0.1:0", build_host(&context)).await?);
    let addr = listener.local_addr();

    let manager = Arc::new(LifecycleManager::from_context(&context));
    let mut states = manager.subscribe();
    let runner = {
        let manager = Arc::clone(&manager);
        let listener = Arc::clone(&listener);
        tokio::spawn(async move { manager.run(listener).await })
    };
    states
        .wait_for(|state| *state >= LifecycleState::Running)
        .await?;

    let mcp = status_line(addr, &initialize_request("/mcp")).await?;
    assert!(mcp.contains(" 200"), "initialize over HTTP: {mcp}");

    let elsewhere = status_line(
        addr,
        "GET /elsewhere HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await?;
    assert!(elsewhere.contains(" 404"), "unrouted path: {elsewhere}");

    context.request_shutdown();
    let report = timeout(Duration::from_secs(10), runner).await???;
    assert_eq!(report.trigger, ShutdownTrigger::Signal);
    assert_eq!(manager.state(), LifecycleState::Stopped);

    assert!(
        TcpStream::connect(addr).await.is_err(),
        "listener must refuse connections after shutdown"
    );
    Ok(())
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SlowParams {}

#[derive(Debug, Serialize, JsonSchema)]
struct SlowOutput {
    output: String,
}

/// Host exposing one `slow` tool that signals `started` and then sleeps for `delay`.
fn slow_host(context: &AppContext, delay: Duration, started: Arc<Notify>) -> McpHost {
    let tool = tool_with_output(
        "slow",
        move |_ctx: ToolContext,
              _session: Session,
              writer: ToolResponseWriter<SlowOutput>,
              _request: ToolRequest<SlowParams>| {
            let started = Arc::clone(&started);
            async move {
                started.notify_one();
                tokio::time::sleep(delay).await;
                writer.set_structured(SlowOutput {
                    output: "done".into(),
                });
                Ok::<(), HandlerError>(())
            }
        },
    );
    let capabilities = CapabilityRegistry::new(ServerIdentity::new("slow-host", "0.0.1"))
        .add_tool(tool)
        .expect("slow tool registers")
        .build()
        .expect("capabilities build");
    McpHost::new(capabilities, context.clone())
}

/// POST a `tools/call` for `slow` and collect the raw response until the result event lands.
fn call_slow_tool(addr: std::net::SocketAddr) -> JoinHandle<Result<String>> {
    tokio::spawn(async move {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"slow","arguments":{}}}"#;
        let request = format!(
            "POST /mcp HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nAccept: application/json, text/event-stream\r\nMCP-Protocol-Version: 2025-06-18\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n{body}",
            len = body.len()
        );
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(request.as_bytes()).await?;
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let read = stream.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            received.extend_from_slice(&buf[..read]);
            let text = String::from_utf8_lossy(&received);
            let result_event_complete = text
                .find("\"structuredContent\"")
                .is_some_and(|at| text[at..].contains("\n\n"));
            if result_event_complete {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&received).into_owned())
    })
}

#[tokio::test]
async fn in_flight_tool_call_completes_during_graceful_shutdown() -> Result<()> {
    let context = AppContext::new(test_server_config());
    let started = Arc::new(Notify::new());
    let host = slow_host(&context, Duration::from_millis(1500), Arc::clone(&started));
    let listener = Arc::new(HttpListener::bind("127.0.0.1:0", host).await?);
    let addr = listener.local_addr();

    let manager = Arc::new(LifecycleManager::from_context(&context));
    let mut states = manager.subscribe();
    let runner = {
        let manager = Arc::clone(&manager);
        let listener = Arc::clone(&listener);
        tokio::spawn(async move { manager.run(listener).await })
    };
    states
        .wait_for(|state| *state >= LifecycleState::Running)
        .await?;

    let response = call_slow_tool(addr);
    timeout(Duration::from_secs(5), started.notified()).await?;
    context.request_shutdown();

    let response = timeout(Duration::from_secs(10), response).await???;
    assert!(
        response.lines().next().is_some_and(|line| line.contains(" 200")),
        "tool call should succeed: {response}"
    );
    assert!(
        response.contains(r#""structuredContent":{"output":"done"}"#),
        "structured result should be delivered: {response}"
    );

    let report = timeout(Duration::from_secs(10), runner).await???;
    assert_eq!(report.trigger, ShutdownTrigger::Signal);
    assert_eq!(manager.state(), LifecycleState::Stopped);
    Ok(())
}

#[tokio::test]
async fn tool_call_outlasting_the_grace_period_times_out_shutdown() -> Result<()> {
    let mut config = test_server_config();
    config.server.shutdown_grace_secs = 1;
    let context = AppContext::new(config);
    let started = Arc::new(Notify::new());
    let host = slow_host(&context, Duration::from_secs(30), Arc::clone(&started));
    let listener = Arc::new(HttpListener::bind("127.0.0.1:0", host).await?);
    let addr = listener.local_addr();

    let manager = Arc::new(LifecycleManager::from_context(&context));
    let mut states = manager.subscribe();
    let runner = {
        let manager = Arc::clone(&manager);
        let listener = Arc::clone(&listener);
        tokio::spawn(async move { manager.run(listener).await })
    };
    states
        .wait_for(|state| *state >= LifecycleState::Running)
        .await?;

    let response = call_slow_tool(addr);
    timeout(Duration::from_secs(5), started.notified()).await?;
    context.request_shutdown();

    let outcome = timeout(Duration::from_secs(10), runner).await??;
    assert!(
        matches!(outcome, Err(LifecycleError::ShutdownTimeout { grace_secs: 1 })),
        "shutdown should time out: {outcome:?}"
    );
    response.abort();
    Ok(())
}
