use std::{io, net::SocketAddr, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration sources.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize the merged sources into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Required field is missing.
    #[error("Configuration file {path} is missing `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Invalid capability configuration detected while building the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("tool `{name}` is already registered")]
    DuplicateName { name: String },
    #[error("resource `{uri}` is already registered")]
    DuplicateUri { uri: String },
    #[error("tool names cannot be empty")]
    EmptyName,
    #[error("tool `{tool}` has an invalid {kind} schema: {reason}")]
    InvalidSchema {
        tool: String,
        kind: &'static str,
        reason: String,
    },
    #[error("tool `{tool}` references output template `{uri}` which is not a registered resource")]
    UnknownOutputTemplate { tool: String, uri: String },
}

/// Protocol-level failures returned by tool handlers.
///
/// Business failures do not belong here: handlers flag those on the response
/// writer with `set_error(true)` and explain them in a text segment.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),
    #[error("tool invocation was cancelled")]
    Cancelled,
    #[error("tool failed: {message}")]
    Failed { message: String },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Failures reported by a listener implementation.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to resolve local address: {0}")]
    LocalAddr(#[source] io::Error),
    #[error("listener on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("{transport} transport failed: {message}")]
    Transport {
        transport: &'static str,
        message: String,
    },
    #[error("listener task panicked: {message}")]
    Panicked { message: String },
    #[error("listener was already started")]
    AlreadyStarted,
}

/// Terminal outcomes of the lifecycle manager other than a clean stop.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("listener stopped with a fatal error: {0}")]
    Transport(#[source] ListenerError),
    #[error("graceful shutdown failed: {0}")]
    ShutdownFailed(#[source] ListenerError),
    #[error("graceful shutdown did not finish within {grace_secs} seconds")]
    ShutdownTimeout { grace_secs: u64 },
}
