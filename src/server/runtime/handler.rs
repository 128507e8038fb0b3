use std::sync::Arc;

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, ErrorData, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerInfo,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::json;
use tracing::{warn, Instrument};

use super::wire;
use crate::{
    capabilities::{
        JsonObject, ServerCapabilities, Session, StructuredTextPolicy, ToolContext, ToolInvocation,
    },
    lib::telemetry::InvocationSpan,
    server::context::AppContext,
};

/// rmcp adapter over the immutable capability aggregate.
///
/// Cheap to clone; the HTTP transport builds one per session.
#[derive(Clone)]
pub struct McpHost {
    capabilities: Arc<ServerCapabilities>,
    context: AppContext,
    text_policy: StructuredTextPolicy,
}

impl McpHost {
    pub fn new(capabilities: Arc<ServerCapabilities>, context: AppContext) -> Self {
        let text_policy = context.config().tools.text_policy();
        Self {
            capabilities,
            context,
            text_policy,
        }
    }

    pub fn capabilities(&self) -> &Arc<ServerCapabilities> {
        &self.capabilities
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Run one tool call outside any transport.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        context: ToolContext,
        session: Session,
    ) -> Result<CallToolResult, ErrorData> {
        let tool = self.capabilities.tool(name).ok_or_else(|| {
            ErrorData::invalid_params(
                format!("unknown tool `{name}`"),
                Some(json!({ "tool": name })),
            )
        })?;

        let invocation = ToolInvocation::new(context, session, arguments.unwrap_or_default())
            .with_text_policy(self.text_policy);
        let span = InvocationSpan::start(invocation.invocation_id, name);
        let outcome = tool
            .invoke(invocation)
            .instrument(span.span().clone())
            .await;

        match outcome {
            Ok(result) => {
                let is_error = result.is_error();
                span.finish("ok", is_error);
                Ok(wire::call_tool_result(result))
            }
            Err(err) => {
                warn!(
                    target: "chatapp_mcp::tools",
                    tool = name,
                    error = %err,
                    "Tool invocation failed"
                );
                span.finish("failed", true);
                Err(wire::handler_error(name, err))
            }
        }
    }
}

impl ServerHandler for McpHost {
    fn get_info(&self) -> ServerInfo {
        wire::server_info(&self.capabilities)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self
            .capabilities
            .tools()
            .map(wire::tool)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_context = ToolContext::new(context.ct.clone(), self.context.shutdown_token());
        let session = Session::new(context.peer.clone());
        self.invoke(&request.name, request.arguments, tool_context, session)
            .await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resources = self
            .capabilities
            .resources()
            .map(wire::resource)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let resource = self.capabilities.resource(&request.uri).ok_or_else(|| {
            ErrorData::resource_not_found(
                format!("resource `{}` is not registered", request.uri),
                Some(json!({ "uri": request.uri })),
            )
        })?;
        Ok(ReadResourceResult {
            contents: vec![wire::resource_contents(resource)?],
        })
    }
}
