//! Server-side modules: configuration, process context, lifecycle and protocol runtime.
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod runtime;
