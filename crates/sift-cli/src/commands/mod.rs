//! Command implementations.

pub mod config;
pub mod extract;
pub mod windows;

pub use self::config::execute_config;
pub use self::extract::{execute_extract, run_extraction};
pub use self::windows::execute_windows;

use crate::error::{CliError, Result};
use std::fs;
use std::io::{self, Read};

/// Read a document from a path, or from stdin when the path is `-`.
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input)
            .map_err(|e| CliError::InvalidInput(format!("Cannot read '{}': {}", input, e)))
    }
}
