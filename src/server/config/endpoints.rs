use std::path::Path;

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_SESSION_KEY_PREFIX: &str = "chatgptapp:";

/// Endpoints of the external collaborators (public URL, OAuth issuer, session store).
///
/// Values are passed through untouched; only their presence is checked.
#[derive(Debug, Clone)]
pub struct EndpointsSection {
    pub public_url: String,
    pub auth_issuer_url: String,
    pub session_store_url: String,
    pub session_key_prefix: String,
}

impl EndpointsSection {
    /// URL clients use to reach the MCP route.
    pub fn mcp_url(&self, mcp_path: &str) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), mcp_path)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawEndpointsSection {
    pub public_url: Option<String>,
    pub auth_issuer_url: Option<String>,
    pub session_store_url: Option<String>,
    pub session_key_prefix: Option<String>,
}

pub fn parse_endpoints_section(
    raw: Option<RawEndpointsSection>,
    path: &Path,
) -> Result<EndpointsSection, ConfigError> {
    let raw = raw.ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "endpoints",
    })?;

    Ok(EndpointsSection {
        public_url: required(raw.public_url, path, "endpoints.public_url")?,
        auth_issuer_url: required(raw.auth_issuer_url, path, "endpoints.auth_issuer_url")?,
        session_store_url: required(raw.session_store_url, path, "endpoints.session_store_url")?,
        session_key_prefix: raw
            .session_key_prefix
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_KEY_PREFIX.to_string()),
    })
}

fn required(
    value: Option<String>,
    path: &Path,
    field: &'static str,
) -> Result<String, ConfigError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingField {
            path: path.to_path_buf(),
            field,
        })
}
