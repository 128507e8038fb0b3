//! `test_123`: echoes its input back and renders it in the tester widget.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    capabilities::{
        tool_with_output, ResourceDescriptor, Session, ToolContext, ToolHandler, ToolRequest,
        ToolResponseWriter,
    },
    lib::errors::HandlerError,
};

pub const TOOL_NAME: &str = "test_123";
pub const WIDGET_URI: &str = "ui://widget/form.v1.html";
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

const WIDGET_HTML: &str = include_str!("../../assets/widget/form.v1.html");

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct Test123Params {
    /// Text to send to the tester tool.
    pub input: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Test123Output {
    pub output: String,
}

async fn test_123(
    _ctx: ToolContext,
    _session: Session,
    writer: ToolResponseWriter<Test123Output>,
    request: ToolRequest<Test123Params>,
) -> Result<(), HandlerError> {
    writer.set_structured(Test123Output {
        output: format!("Test123 received input: {}", request.args().input),
    });
    Ok(())
}

pub fn tool() -> impl ToolHandler {
    tool_with_output(TOOL_NAME, test_123)
        .description("Use this tool when the user asks you to test the ChatGPT App.")
        .output_template(WIDGET_URI)
        .invoking_message("Displaying the tester tool.")
        .invoked_message("Displayed the tester tool.")
}

pub fn widget() -> ResourceDescriptor {
    ResourceDescriptor::text(WIDGET_URI, "Tester Tool UI", WIDGET_MIME_TYPE, WIDGET_HTML)
}
