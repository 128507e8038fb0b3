use tracing::info;

use super::ServerConfig;

pub fn log_loaded(config: &ServerConfig) {
    info!(
        target: "chatapp_mcp::config",
        path = %config.source_path.display(),
        host = %config.server.host,
        port = config.server.port,
        mcp_url = %config.mcp_url(),
        auth_issuer_url = %config.endpoints.auth_issuer_url,
        session_key_prefix = %config.endpoints.session_key_prefix,
        shutdown_grace_secs = config.server.shutdown_grace_secs,
        log_requests = config.server.log_requests,
        echo_structured_text = config.tools.echo_structured_text,
        "Configuration loaded successfully"
    );
}
