//! Tooling & Integration Layer
//!
//! Command-line entry points over the attachment service.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
