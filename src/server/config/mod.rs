//! Load and validate server configuration.
use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::lib::errors::ConfigError;

pub mod endpoints;
pub mod server;
pub mod telemetry;
pub mod tools;

pub use endpoints::{
    parse_endpoints_section, EndpointsSection, RawEndpointsSection, DEFAULT_SESSION_KEY_PREFIX,
};
pub use server::{
    parse_server_section, RawServerSection, ServerSection, DEFAULT_HOST, DEFAULT_MCP_PATH,
    DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE_SECS,
};
pub use tools::{parse_tools_section, RawToolsSection, ToolsSection};

/// Prefix of per-field environment overrides, e.g. `CHATAPP_SERVER__PORT`.
pub const ENV_OVERRIDE_PREFIX: &str = "CHATAPP";

/// Top-level configuration container.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub endpoints: EndpointsSection,
    pub tools: ToolsSection,
    pub source_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawServerConfig {
    server: Option<RawServerSection>,
    endpoints: Option<RawEndpointsSection>,
    tools: Option<RawToolsSection>,
}

impl ServerConfig {
    /// Load configuration from a specific path that must exist.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        Self::load(path, true)
    }

    /// Merge the TOML file at `path` with `CHATAPP_*` environment overrides.
    pub fn load(path: PathBuf, file_required: bool) -> Result<Self, ConfigError> {
        Self::load_layered(path, file_required, None)
    }

    /// Like [`ServerConfig::load`], reading overrides from `env_vars` instead of
    /// the process environment when given.
    pub fn load_layered(
        path: PathBuf,
        file_required: bool,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        info!(
            target: "chatapp_mcp::config",
            path = %path.display(),
            file_required,
            "Starting configuration load"
        );

        let builder = config::Config::builder()
            .add_source(config::File::from(path.clone()).required(file_required))
            .add_source(
                config::Environment::with_prefix(ENV_OVERRIDE_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env_vars),
            );
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "chatapp_mcp::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawServerConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "chatapp_mcp::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            error!(
                target: "chatapp_mcp::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    /// Public URL of the MCP route.
    pub fn mcp_url(&self) -> String {
        self.endpoints.mcp_url(&self.server.mcp_path)
    }

    fn from_raw(raw: RawServerConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let server = parse_server_section(raw.server, &path)?;
        let endpoints = parse_endpoints_section(raw.endpoints, &path)?;
        let tools = parse_tools_section(raw.tools);

        Ok(Self {
            server,
            endpoints,
            tools,
            source_path: path,
        })
    }
}
