//! Configuration management for the CLI.
//!
//! Two files are read: the user configuration (provider, display settings
//! and engine tuning) and a schema file declaring the record types to
//! extract.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use sift_domain::{FieldSpec, Payload, RecordSchema, SchemaSet};
use sift_extractor::ExtractionConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model provider
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Engine tuning
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Ollama connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Ollama endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP timeout for a single request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".sift").join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.extraction.validate()?;
        Ok(config)
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

/// Schema file layout: `[[record]]` blocks with `[[record.field]]` entries
#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    record: Vec<RecordDefinition>,
}

#[derive(Debug, Deserialize)]
struct RecordDefinition {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    field: Vec<FieldSpec>,
    #[serde(default)]
    inject: Payload,
}

/// Load a schema file into a registry.
pub fn load_schemas(path: &Path) -> Result<SchemaSet> {
    let contents = fs::read_to_string(path)?;
    parse_schemas(&contents)
}

/// Parse schema TOML into a registry.
pub fn parse_schemas(contents: &str) -> Result<SchemaSet> {
    let file: SchemaFile = toml::from_str(contents)?;
    if file.record.is_empty() {
        return Err(CliError::Schema("no [[record]] types declared".to_string()));
    }

    let mut schemas = SchemaSet::new();
    for def in file.record {
        let name = def.name.trim().to_string();
        if name.is_empty() {
            return Err(CliError::Schema("record type with an empty name".to_string()));
        }
        if schemas.names().iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            return Err(CliError::Schema(format!("record type '{}' declared twice", name)));
        }
        if def.field.is_empty() {
            return Err(CliError::Schema(format!("record type '{}' has no fields", name)));
        }

        let schema = RecordSchema {
            name,
            description: def.description,
            fields: def.field,
        };
        schemas.register_with_injected(Arc::new(schema), def.inject);
    }

    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sift_domain::FieldKind;
    use std::io::Write;

    const SCHEMA: &str = r#"
[[record]]
name = "medication"
description = "A drug the patient takes"

[[record.field]]
name = "name"
kind = "coded_concept"
required = true

[[record.field]]
name = "dose"

[record.inject]
status = "active"

[[record]]
name = "allergy"

[[record.field]]
name = "substance"
kind = "coded_concept"
required = true
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.endpoint, "http://localhost:11434");
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert!(config.settings.color);
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[provider]\nmodel = \"mistral\"\n\n[extraction]\nconcurrency_limit = 5\n\n[extraction.chunking]\nmax_chars = 1000"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.provider.model, "mistral");
        assert_eq!(config.provider.endpoint, "http://localhost:11434");
        assert_eq!(config.extraction.concurrency_limit, 5);
        assert_eq!(config.extraction.chunking.max_chars, 1000);
        assert_eq!(config.extraction.max_retries, 2);
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[extraction]\nwindow_timeout_secs = 600\ntotal_timeout_secs = 60").unwrap();

        assert!(matches!(Config::load_from(file.path()), Err(CliError::Extractor(_))));
    }

    #[test]
    fn test_parse_schemas() {
        let schemas = parse_schemas(SCHEMA).unwrap();
        assert_eq!(schemas.names(), vec!["allergy", "medication"]);

        let medication = schemas.resolve("medication").unwrap();
        assert_eq!(medication.descriptor.fields().len(), 2);
        assert_eq!(medication.descriptor.fields()[1].kind, FieldKind::Text);
        assert_eq!(medication.injected["status"], json!("active"));
        assert!(schemas.resolve("allergy").unwrap().injected.is_empty());
    }

    #[test]
    fn test_schema_errors() {
        assert!(matches!(parse_schemas(""), Err(CliError::Schema(_))));
        assert!(matches!(
            parse_schemas("[[record]]\nname = \"empty\"\n"),
            Err(CliError::Schema(_))
        ));

        let twice = "[[record]]\nname = \"a\"\n[[record.field]]\nname = \"x\"\n\
                     [[record]]\nname = \"A\"\n[[record.field]]\nname = \"y\"\n";
        assert!(matches!(parse_schemas(twice), Err(CliError::Schema(_))));

        assert!(matches!(parse_schemas("[[record]]\nname = 3"), Err(CliError::Toml(_))));
    }

    #[test]
    fn test_load_schemas_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCHEMA.as_bytes()).unwrap();

        let schemas = load_schemas(file.path()).unwrap();
        assert_eq!(schemas.len(), 2);
    }
}
