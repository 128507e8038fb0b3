//! Conversions between capability descriptors and rmcp protocol models.
//!
//! Descriptors already serialize in protocol shape (`inputSchema`, `_meta`,
//! `mimeType`), so conversion goes through `serde_json::Value`.
use rmcp::model::{
    CallToolResult, Content, ErrorData, Implementation, ProtocolVersion, Resource,
    ResourceContents, ServerCapabilities as ProtocolCapabilities, ServerInfo, Tool,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::{
    capabilities::{ResourceDescriptor, ServerCapabilities, ToolDescriptor, ToolResult},
    lib::errors::HandlerError,
};

fn convert<S: Serialize, T: DeserializeOwned>(value: &S, what: &str) -> Result<T, ErrorData> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|err| ErrorData::internal_error(format!("failed to encode {what}: {err}"), None))
}

pub fn tool(descriptor: &ToolDescriptor) -> Result<Tool, ErrorData> {
    convert(descriptor, "tool descriptor")
}

pub fn resource(descriptor: &ResourceDescriptor) -> Result<Resource, ErrorData> {
    convert(descriptor, "resource descriptor")
}

pub fn resource_contents(descriptor: &ResourceDescriptor) -> Result<ResourceContents, ErrorData> {
    convert(&descriptor.contents(), "resource contents")
}

/// Identity and capabilities announced during `initialize`.
pub fn server_info(capabilities: &ServerCapabilities) -> ServerInfo {
    let identity = capabilities.identity();
    let server_info = serde_json::to_value(identity)
        .and_then(serde_json::from_value::<Implementation>)
        .unwrap_or_else(|_| Implementation {
            name: identity.name.clone(),
            version: identity.version.clone(),
            ..Implementation::default()
        });
    let protocol_version =
        serde_json::from_value::<ProtocolVersion>(json!(capabilities.protocol_version()))
            .unwrap_or(ProtocolVersion::LATEST);

    ServerInfo {
        protocol_version,
        capabilities: ProtocolCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .build(),
        server_info,
        instructions: capabilities.instructions().map(str::to_string),
        ..ServerInfo::default()
    }
}

/// Render a finished invocation as a protocol result.
pub fn call_tool_result(result: ToolResult) -> CallToolResult {
    let (structured, texts, is_error) = result.into_parts();
    let content = texts.into_iter().map(Content::text).collect::<Vec<_>>();
    let mut rendered = if is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    };
    rendered.structured_content = structured;
    rendered
}

/// Map protocol-level handler failures onto JSON-RPC errors.
pub fn handler_error(tool: &str, err: HandlerError) -> ErrorData {
    match err {
        HandlerError::InvalidArguments(source) => ErrorData::invalid_params(
            format!("invalid arguments for tool `{tool}`: {source}"),
            Some(json!({ "tool": tool })),
        ),
        HandlerError::Cancelled => ErrorData::internal_error(
            format!("tool `{tool}` was cancelled"),
            Some(json!({ "tool": tool, "reason": "cancelled" })),
        ),
        HandlerError::Failed { message } => {
            ErrorData::internal_error(message, Some(json!({ "tool": tool })))
        }
    }
}
