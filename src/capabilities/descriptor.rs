//! Pure capability descriptors: tools, resources and server identity.
use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Meta key pointing a tool at the resource that renders its output.
pub const OUTPUT_TEMPLATE_META_KEY: &str = "openai/outputTemplate";
/// Meta key for the status line shown while a tool runs.
pub const INVOKING_META_KEY: &str = "openai/toolInvocation/invoking";
/// Meta key for the status line shown once a tool has finished.
pub const INVOKED_META_KEY: &str = "openai/toolInvocation/invoked";

/// JSON object as carried on the wire.
pub type JsonObject = Map<String, Value>;

/// Presentation hint attached to a tool.
///
/// Nested maps are ordered, so a descriptor always serializes to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Number(Number),
    Bool(bool),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Number(Number::from(value))
    }
}

/// Non-finite floats have no JSON number form and are kept as their string spelling.
impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(number) => MetaValue::Number(number),
            None => MetaValue::String(value.to_string()),
        }
    }
}

impl From<BTreeMap<String, MetaValue>> for MetaValue {
    fn from(value: BTreeMap<String, MetaValue>) -> Self {
        MetaValue::Map(value)
    }
}

/// Declared shape and presentation data of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: JsonObject,
    pub output_schema: JsonObject,
    #[serde(rename = "_meta", skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, MetaValue>,
}

impl ToolDescriptor {
    /// Resource URI the client should render this tool's output with.
    pub fn output_template(&self) -> Option<&str> {
        self.meta
            .get(OUTPUT_TEMPLATE_META_KEY)
            .and_then(MetaValue::as_str)
    }
}

/// Body of a resource. The host never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBody {
    Text(String),
    Blob(Vec<u8>),
}

/// Contents of a resource in protocol JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// URI-addressed immutable content item registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mime_type: String,
    #[serde(skip)]
    pub body: ResourceBody,
}

impl ResourceDescriptor {
    /// Text resource such as an inline HTML widget.
    pub fn text(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            title: None,
            description: None,
            mime_type: mime_type.into(),
            body: ResourceBody::Text(body.into()),
        }
    }

    /// Binary resource; encoded as base64 when read.
    pub fn blob(
        uri: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            title: None,
            description: None,
            mime_type: mime_type.into(),
            body: ResourceBody::Blob(body),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Contents returned by a read request.
    pub fn contents(&self) -> ResourceContent {
        let (text, blob) = match &self.body {
            ResourceBody::Text(text) => (Some(text.clone()), None),
            ResourceBody::Blob(bytes) => (None, Some(STANDARD.encode(bytes))),
        };
        ResourceContent {
            uri: self.uri.clone(),
            mime_type: self.mime_type.clone(),
            text,
            blob,
        }
    }
}

/// Name, version and display title advertised during initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ServerIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
