use anyhow::Result;
use rmcp::{
    model::{CallToolRequestParam, ClientInfo, ReadResourceRequestParam},
    serve_client,
    service::{RoleClient, RunningService, ServiceError},
    ServiceExt,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use chatapp_mcp::server::context::AppContext;

use crate::common::{build_host, test_server_config};

type Client = RunningService<RoleClient, ClientInfo>;

async fn connect(context: &AppContext) -> Result<(Client, JoinHandle<Result<()>>)> {
    let host = build_host(context);
    let (server_transport, client_transport) = tokio::io::duplex(16 * 1024);
    let server_task = tokio::spawn(async move {
        host.serve(server_transport).await?.waiting().await?;
        Result::<_, anyhow::Error>::Ok(())
    });
    let client = serve_client(ClientInfo::default(), client_transport).await?;
    Ok((client, server_task))
}

#[tokio::test]
async fn initialize_advertises_identity_and_instructions() -> Result<()> {
    let context = AppContext::new(test_server_config());
    let (client, server_task) = connect(&context).await?;

    let info = client.peer_info().cloned().expect("server info after initialize");
    assert_eq!(info.server_info.name, "Example ChatGPT App");
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());
    assert!(info
        .instructions
        .as_deref()
        .is_some_and(|text| text.contains("test_123")));

    let _ = client.cancel().await;
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn tools_are_listed_with_object_schemas() -> Result<()> {
    let context = AppContext::new(test_server_config());
    let (client, server_task) = connect(&context).await?;

    let list = client.list_tools(None).await?;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let tool = list
        .tools
        .iter()
        .find(|tool| tool.name.as_ref() == "test_123")
        .expect("test_123 registered");
    let rendered = serde_json::to_value(tool)?;
    assert_eq!(
        rendered["description"],
        "Use this tool when the user asks you to test the ChatGPT App."
    );
    assert_eq!(rendered["inputSchema"]["type"], "object");
    assert_eq!(rendered["outputSchema"]["type"], "object");
    assert!(rendered["inputSchema"]["properties"]["input"].is_object());
    Ok(())
}

#[tokio::test]
async fn widget_resource_is_listed_and_readable() -> Result<()> {
    let context = AppContext::new(test_server_config());
    let (client, server_task) = connect(&context).await?;

    let resources = client.list_resources(None).await?;
    let listed = serde_json::to_value(&resources.resources)?;
    assert_eq!(listed[0]["uri"], "ui://widget/form.v1.html");
    assert_eq!(listed[0]["name"], "Tester Tool UI");

    let read = client
        .read_resource(ReadResourceRequestParam {
            uri: "ui://widget/form.v1.html".into(),
        })
        .await?;
    let contents = serde_json::to_value(&read.contents)?;
    assert_eq!(contents[0]["mimeType"], "text/html+skybridge");
    assert!(contents[0]["text"]
        .as_str()
        .is_some_and(|html| html.contains("<form>")));

    let missing = client
        .read_resource(ReadResourceRequestParam {
            uri: "ui://widget/missing.html".into(),
        })
        .await;
    assert!(matches!(missing, Err(ServiceError::McpError(_))));

    let _ = client.cancel().await;
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn invalid_arguments_are_protocol_errors() -> Result<()> {
    let context = AppContext::new(test_server_config());
    let (client, server_task) = connect(&context).await?;

    let result = client
        .call_tool(CallToolRequestParam {
            name: "test_123".into(),
            arguments: json!({ "input": ["not", "a", "string"] }).as_object().cloned(),
        })
        .await;
    let _ = client.cancel().await;
    let _ = server_task.await;

    let error = match result {
        Err(ServiceError::McpError(inner)) => serde_json::to_value(inner)?,
        other => anyhow::bail!("unexpected result: {other:?}"),
    };
    assert_eq!(error["code"], Value::from(-32602));
    Ok(())
}

#[tokio::test]
async fn structured_only_deployment_skips_the_text_echo() -> Result<()> {
    let mut config = test_server_config();
    config.tools.echo_structured_text = false;
    let context = AppContext::new(config);
    let (client, server_task) = connect(&context).await?;

    let response = client
        .call_tool(CallToolRequestParam {
            name: "test_123".into(),
            arguments: json!({ "input": "quiet" }).as_object().cloned(),
        })
        .await?;
    let _ = client.cancel().await;
    let _ = server_task.await;

    assert!(response.content.is_empty());
    assert_eq!(
        response.structured_content,
        Some(json!({ "output": "Test123 received input: quiet" }))
    );
    Ok(())
}
