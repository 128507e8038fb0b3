//! Library crate root re-exporting capability, server and tool modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod capabilities;
pub mod cli;
pub mod server;
pub mod tools;
