//! Aggregation of tools and resources into one immutable capability set.
use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{ser::SerializeStruct, Serialize, Serializer};
use serde_json::Value;

use super::{
    contract::ToolHandler,
    descriptor::{JsonObject, ResourceDescriptor, ServerIdentity, ToolDescriptor},
};
use crate::lib::errors::RegistrationError;

/// Protocol revision advertised when none is configured.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Builder that validates registrations before producing `ServerCapabilities`.
///
/// Every method consumes the builder, so a registry that reported an error
/// cannot be built afterwards.
pub struct CapabilityRegistry {
    identity: ServerIdentity,
    protocol_version: String,
    instructions: Option<String>,
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
    resources: BTreeMap<String, ResourceDescriptor>,
}

impl CapabilityRegistry {
    pub fn new(identity: ServerIdentity) -> Self {
        Self {
            identity,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            instructions: None,
            tools: BTreeMap::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn add_tool(mut self, tool: impl ToolHandler) -> Result<Self, RegistrationError> {
        let descriptor = tool.descriptor();
        if descriptor.name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        validate_schema(&descriptor.name, "input", &descriptor.input_schema)?;
        validate_schema(&descriptor.name, "output", &descriptor.output_schema)?;

        let name = descriptor.name.clone();
        if self.tools.contains_key(&name) {
            return Err(RegistrationError::DuplicateName { name });
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(self)
    }

    pub fn add_resource(mut self, resource: ResourceDescriptor) -> Result<Self, RegistrationError> {
        if self.resources.contains_key(&resource.uri) {
            return Err(RegistrationError::DuplicateUri { uri: resource.uri });
        }
        self.resources.insert(resource.uri.clone(), resource);
        Ok(self)
    }

    /// Check cross references and freeze the aggregate.
    pub fn build(self) -> Result<Arc<ServerCapabilities>, RegistrationError> {
        for tool in self.tools.values() {
            let descriptor = tool.descriptor();
            if let Some(uri) = descriptor.output_template() {
                if !self.resources.contains_key(uri) {
                    return Err(RegistrationError::UnknownOutputTemplate {
                        tool: descriptor.name.clone(),
                        uri: uri.to_string(),
                    });
                }
            }
        }

        Ok(Arc::new(ServerCapabilities {
            identity: self.identity,
            protocol_version: self.protocol_version,
            instructions: self.instructions,
            tools: self.tools,
            resources: self.resources,
        }))
    }
}

fn validate_schema(
    tool: &str,
    kind: &'static str,
    schema: &JsonObject,
) -> Result<(), RegistrationError> {
    match schema.get("type") {
        Some(Value::String(ty)) if ty == "object" => Ok(()),
        other => Err(RegistrationError::InvalidSchema {
            tool: tool.to_string(),
            kind,
            reason: match other {
                Some(value) => format!("expected type `object`, found {value}"),
                None => "schema does not declare `type: object`".to_string(),
            },
        }),
    }
}

/// Immutable set of everything the server exposes.
///
/// Tools and resources iterate in name and URI order.
pub struct ServerCapabilities {
    identity: ServerIdentity,
    protocol_version: String,
    instructions: Option<String>,
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
    resources: BTreeMap<String, ResourceDescriptor>,
}

impl ServerCapabilities {
    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.get(name)
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|tool| tool.descriptor())
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(uri)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

impl fmt::Debug for ServerCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCapabilities")
            .field("identity", &self.identity)
            .field("protocol_version", &self.protocol_version)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Serialize for ServerCapabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tools: Vec<&ToolDescriptor> = self.tools().collect();
        let resources: Vec<&ResourceDescriptor> = self.resources().collect();
        let mut state = serializer.serialize_struct("ServerCapabilities", 5)?;
        state.serialize_field("serverInfo", &self.identity)?;
        state.serialize_field("protocolVersion", &self.protocol_version)?;
        state.serialize_field("instructions", &self.instructions)?;
        state.serialize_field("tools", &tools)?;
        state.serialize_field("resources", &resources)?;
        state.end()
    }
}
