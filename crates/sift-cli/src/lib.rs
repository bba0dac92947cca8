//! Sift CLI library.
//!
//! This library provides the core functionality for the `sift` command-line
//! interface: configuration and schema loading, command execution and output
//! formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::{load_schemas, parse_schemas, Config, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
