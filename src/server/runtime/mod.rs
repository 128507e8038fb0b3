//! MCP protocol adapter and server startup.
mod handler;
mod startup;
pub mod wire;

pub use handler::McpHost;
pub use startup::{
    run_server, RuntimeExit, EXIT_CONFIG, EXIT_FAILURE, EXIT_LISTENER, EXIT_REGISTRATION,
    EXIT_SHUTDOWN_FAILED, EXIT_SHUTDOWN_TIMEOUT, EXIT_TRANSPORT,
};
