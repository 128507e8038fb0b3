//! Tools and resources registered by this deployment.

pub mod tester;

use std::sync::Arc;

use crate::{
    capabilities::{CapabilityRegistry, ServerCapabilities, ServerIdentity, DEFAULT_PROTOCOL_VERSION},
    lib::errors::RegistrationError,
};

pub const SERVER_NAME: &str = "Example ChatGPT App";

const INSTRUCTIONS: &str = "Example ChatGPT App. Call `test_123` when the user asks to test the app; \
the result is rendered with the tester widget (ui://widget/form.v1.html).";

/// Build the immutable capability aggregate served by every transport.
pub fn build_capabilities() -> Result<Arc<ServerCapabilities>, RegistrationError> {
    CapabilityRegistry::new(
        ServerIdentity::new(SERVER_NAME, env!("CARGO_PKG_VERSION")).with_title(SERVER_NAME),
    )
    .protocol_version(DEFAULT_PROTOCOL_VERSION)
    .instructions(INSTRUCTIONS)
    .add_resource(tester::widget())?
    .add_tool(tester::tool())?
    .build()
}
