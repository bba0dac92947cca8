//! Windows command implementation.

use super::read_input;
use crate::cli::WindowsArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use sift_extractor::{split, ChunkingPolicy};

/// Execute the windows command.
pub async fn execute_windows(args: WindowsArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let text = read_input(&args.input)?;
    let policy = window_policy(&args, config);
    policy.validate()?;

    let windows = split(&text, &policy);
    println!("{}", formatter.format_windows(&windows)?);

    Ok(())
}

/// Configured chunking policy with command-line overrides applied.
fn window_policy(args: &WindowsArgs, config: &Config) -> ChunkingPolicy {
    let mut policy = config.extraction.chunking.clone();
    if let Some(max_chars) = args.max_chars {
        policy.max_chars = max_chars;
    }
    if let Some(overlap) = args.overlap {
        policy.chunk_overlap = overlap;
    }
    policy
}
