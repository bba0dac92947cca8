//! Extract command implementation.

use super::read_input;
use crate::cli::ExtractArgs;
use crate::config::{load_schemas, Config};
use crate::error::Result;
use crate::output::Formatter;
use sift_domain::{Completion, SchemaSet};
use sift_extractor::{extract_document, ExtractionConfig};
use sift_llm::{OllamaProvider, PromptedCompletion};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let text = read_input(&args.input)?;
    let schemas = load_schemas(&args.schema)?;
    let engine = engine_config(&args, config);
    engine.validate()?;

    let endpoint = args.endpoint.unwrap_or_else(|| config.provider.endpoint.clone());
    let model = args.model.unwrap_or_else(|| config.provider.model.clone());
    info!(endpoint = %endpoint, model = %model, types = ?schemas.names(), "Using Ollama provider");

    let provider = OllamaProvider::with_timeout(
        endpoint,
        model,
        Duration::from_secs(config.provider.request_timeout_secs),
    )?;
    let capability: Arc<dyn Completion> = Arc::new(PromptedCompletion::new(provider));

    println!("{}", run_extraction(&text, &schemas, capability, &engine, formatter).await?);
    Ok(())
}

/// Run the engine and render the result.
pub async fn run_extraction(
    text: &str,
    schemas: &SchemaSet,
    capability: Arc<dyn Completion>,
    engine: &ExtractionConfig,
    formatter: &Formatter,
) -> Result<String> {
    let result = extract_document(text, schemas, capability, engine).await?;
    formatter.format_result(&result)
}

/// Engine settings: preset or configured, then command-line overrides.
fn engine_config(args: &ExtractArgs, config: &Config) -> ExtractionConfig {
    let mut engine = match args.preset {
        Some(preset) => preset.into(),
        None => config.extraction.clone(),
    };
    if let Some(concurrency) = args.concurrency {
        engine.concurrency_limit = concurrency;
    }
    if args.no_fallback {
        engine.enable_zero_yield_fallback = false;
    }
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PresetArg;
    use std::path::PathBuf;

    fn args() -> ExtractArgs {
        ExtractArgs {
            input: "note.txt".to_string(),
            schema: PathBuf::from("schema.toml"),
            endpoint: None,
            model: None,
            preset: None,
            concurrency: None,
            no_fallback: false,
        }
    }

    #[test]
    fn test_engine_config_uses_loaded_settings() {
        let mut config = Config::default();
        config.extraction.max_retries = 4;

        assert_eq!(engine_config(&args(), &config).max_retries, 4);
    }

    #[test]
    fn test_engine_config_overrides() {
        let args = ExtractArgs {
            preset: Some(PresetArg::Aggressive),
            concurrency: Some(9),
            no_fallback: true,
            ..args()
        };

        let engine = engine_config(&args, &Config::default());
        assert_eq!(engine.concurrency_limit, 9);
        assert!(!engine.enable_zero_yield_fallback);
        assert_eq!(engine.chunking, ExtractionConfig::aggressive().chunking);
    }
}
