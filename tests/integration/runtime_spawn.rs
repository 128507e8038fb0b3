use std::{process::Command as StdCommand, time::Duration};

use anyhow::Result;
use rmcp::{
    model::{CallToolRequestParam, ClientInfo},
    serve_client,
};
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::common::{fixture, spawn_server_process, BINARY_PATH};

#[tokio::test]
async fn stdio_client_lists_and_calls_tools_then_exits_cleanly() -> Result<()> {
    let (mut child, transport, stderr_task) =
        spawn_server_process("tests/fixtures/config_valid.toml").await?;

    let client = serve_client(ClientInfo::default(), transport).await?;
    let list = client.list_tools(None).await?;
    assert!(
        list.tools.iter().any(|tool| tool.name.as_ref() == "test_123"),
        "list_tools should include test_123: {:?}",
        list.tools
    );

    let response = client
        .call_tool(CallToolRequestParam {
            name: "test_123".into(),
            arguments: json!({ "input": "hello" }).as_object().cloned(),
        })
        .await?;
    assert_eq!(
        response.structured_content,
        Some(json!({ "output": "Test123 received input: hello" }))
    );
    let rendered = serde_json::to_value(&response)?;
    assert_eq!(
        rendered["content"][0]["text"],
        Value::String(r#"{"output":"Test123 received input: hello"}"#.into())
    );

    client.cancel().await?;
    let status = timeout(Duration::from_secs(10), child.wait()).await??;
    let stderr = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };
    assert!(
        status.success(),
        "server should exit cleanly but exit status was {status:?}; stderr:\n{stderr}"
    );
    assert!(
        stderr.contains("Server exited properly"),
        "shutdown should be logged: {stderr}"
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn stdio_server_exits_cleanly_on_sigterm_with_stdin_open() -> Result<()> {
    let (mut child, transport, stderr_task) =
        spawn_server_process("tests/fixtures/config_valid.toml").await?;

    // A completed round trip means the server is serving and its signal handler is installed.
    let client = serve_client(ClientInfo::default(), transport).await?;
    client.list_tools(None).await?;

    let pid = child.id().expect("child is running");
    let killed = StdCommand::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()?;
    assert!(killed.success(), "kill -TERM failed: {killed:?}");

    // The client still holds the child's stdin, so only the signal can end the process.
    let status = timeout(Duration::from_secs(10), child.wait()).await??;
    drop(client);
    let stderr = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };
    assert_eq!(
        status.code(),
        Some(0),
        "SIGTERM should end the stdio server cleanly; stderr:\n{stderr}"
    );
    assert!(
        stderr.contains("Termination signal received"),
        "signal should be logged: {stderr}"
    );
    Ok(())
}

#[test]
fn missing_endpoints_exit_with_config_code() {
    let output = StdCommand::new(BINARY_PATH)
        .args(["--transport", "stdio"])
        .env(
            "CHATAPP_CONFIG_PATH",
            fixture("tests/fixtures/config_missing_endpoints.toml"),
        )
        .output()
        .expect("process should start");
    assert_eq!(
        output.status.code(),
        Some(2),
        "configuration exit code (2) expected, got {:?}",
        output.status
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("endpoints"), "stderr: {stderr}");
}

#[test]
fn explicit_config_path_must_exist() {
    let output = StdCommand::new(BINARY_PATH)
        .args(["--config", &fixture("tests/fixtures/does_not_exist.toml")])
        .output()
        .expect("process should start");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_flag_exits_with_usage_failure() {
    let output = StdCommand::new(BINARY_PATH)
        .arg("--no-such-flag")
        .output()
        .expect("process should start");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn capabilities_command_prints_registry_json() {
    let output = StdCommand::new(BINARY_PATH)
        .arg("capabilities")
        .output()
        .expect("process should start");
    assert!(output.status.success(), "status: {:?}", output.status);

    let value: Value =
        serde_json::from_slice(&output.stdout).expect("capabilities output is JSON");
    assert_eq!(value["serverInfo"]["name"], "Example ChatGPT App");
    assert_eq!(value["tools"][0]["name"], "test_123");
    assert_eq!(value["resources"][0]["mimeType"], "text/html+skybridge");
}
