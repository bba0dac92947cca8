//! Config command implementation.

use crate::cli::ConfigArgs;
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::output::Formatter;
use sift_extractor::ExtractionConfig;

/// Execute the config command.
pub async fn execute_config(args: ConfigArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let engine: ExtractionConfig = match args.preset {
        Some(preset) => preset.into(),
        None => config.extraction.clone(),
    };

    println!("{}", render(&engine, formatter.format())?);
    Ok(())
}

fn render(engine: &ExtractionConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(engine)?),
        OutputFormat::Table | OutputFormat::Quiet => Ok(engine.to_toml()?),
    }
}
