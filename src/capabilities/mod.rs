//! Capability descriptors, the typed tool contract and the registry that aggregates them.

pub mod contract;
pub mod descriptor;
pub mod registry;

pub use contract::{
    tool_with_output, Session, StructuredTextPolicy, ToolContext, ToolFuture, ToolHandler,
    ToolInvocation, ToolRequest, ToolResponseWriter, ToolResult, TypedTool,
};
pub use descriptor::{
    JsonObject, MetaValue, ResourceBody, ResourceContent, ResourceDescriptor, ServerIdentity,
    ToolDescriptor, INVOKED_META_KEY, INVOKING_META_KEY, OUTPUT_TEMPLATE_META_KEY,
};
pub use registry::{CapabilityRegistry, ServerCapabilities, DEFAULT_PROTOCOL_VERSION};
