use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_MCP_PATH: &str = "/mcp";
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;
const MAX_SHUTDOWN_GRACE_SECS: u64 = 3600;

/// Server socket and shutdown settings.
#[derive(Debug, Clone)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub mcp_path: String,
    pub shutdown_grace_secs: u64,
    /// Log every HTTP request and response at debug level.
    pub log_requests: bool,
}

impl ServerSection {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mcp_path: Option<String>,
    pub shutdown_grace_secs: Option<u64>,
    pub log_requests: Option<bool>,
}

pub fn parse_server_section(
    raw: Option<RawServerSection>,
    path: &Path,
) -> Result<ServerSection, ConfigError> {
    let server_raw = raw.unwrap_or_default();
    let host = server_raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server_raw.port.unwrap_or(DEFAULT_PORT);
    validate_port(port, path)?;
    let mcp_path = server_raw
        .mcp_path
        .unwrap_or_else(|| DEFAULT_MCP_PATH.to_string());
    validate_mcp_path(&mcp_path, path)?;
    let shutdown_grace_secs = server_raw
        .shutdown_grace_secs
        .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS);
    validate_grace(shutdown_grace_secs, path)?;

    Ok(ServerSection {
        host,
        port,
        mcp_path,
        shutdown_grace_secs,
        log_requests: server_raw.log_requests.unwrap_or(true),
    })
}

fn validate_port(port: u16, path: &Path) -> Result<(), ConfigError> {
    if (1024..=65535).contains(&port) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "server.port",
        message: "Use a port in the range 1024-65535".into(),
    })
}

fn validate_mcp_path(mcp_path: &str, path: &Path) -> Result<(), ConfigError> {
    if mcp_path.len() > 1 && mcp_path.starts_with('/') && !mcp_path.ends_with('/') {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "server.mcp_path",
        message: format!("Use an absolute route such as /mcp (got `{mcp_path}`)"),
    })
}

fn validate_grace(secs: u64, path: &Path) -> Result<(), ConfigError> {
    if (1..=MAX_SHUTDOWN_GRACE_SECS).contains(&secs) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "server.shutdown_grace_secs",
        message: format!("Specify a value between 1 and {MAX_SHUTDOWN_GRACE_SECS} seconds"),
    })
}
