use serde::Deserialize;

use crate::capabilities::StructuredTextPolicy;

/// Per-deployment tool result settings.
#[derive(Debug, Clone)]
pub struct ToolsSection {
    /// Mirror structured payloads into a JSON text segment when a tool wrote no text.
    pub echo_structured_text: bool,
}

impl ToolsSection {
    pub fn text_policy(&self) -> StructuredTextPolicy {
        StructuredTextPolicy::from_echo(self.echo_structured_text)
    }
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            echo_structured_text: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawToolsSection {
    pub echo_structured_text: Option<bool>,
}

pub fn parse_tools_section(raw: Option<RawToolsSection>) -> ToolsSection {
    let raw = raw.unwrap_or_default();
    ToolsSection {
        echo_structured_text: raw.echo_structured_text.unwrap_or(true),
    }
}
