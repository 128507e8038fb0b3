//! CLI entrypoint module structure.
use anyhow::{Context, Result};

use crate::tools;

pub mod args;
pub mod profile;

pub use args::{CliCommand, LaunchProfileArgs, ParsedCommand};
pub use profile::{
    build_launch_args, resolve_config_path, ConfigSource, LaunchProfile, TransportMode,
};

/// Execute CLI command mode and return a user-facing result payload.
pub fn execute_cli_command(command: CliCommand) -> Result<String> {
    match command {
        CliCommand::Capabilities { compact } => {
            let capabilities = tools::build_capabilities()?;
            let rendered = if compact {
                serde_json::to_string(capabilities.as_ref())
            } else {
                serde_json::to_string_pretty(capabilities.as_ref())
            };
            rendered.context("failed to serialize capabilities")
        }
    }
}
