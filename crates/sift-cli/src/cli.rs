//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use sift_extractor::ExtractionConfig;
use std::path::PathBuf;

/// Sift CLI - Extract typed, cited records from long text with a language model.
#[derive(Debug, Parser)]
#[command(name = "sift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (defaults to ~/.sift/config.toml)
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (counts per type)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract records from a document
    Extract(ExtractArgs),

    /// Show how a document would be split into windows
    Windows(WindowsArgs),

    /// Print an engine configuration as TOML
    Config(ConfigArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document to read, or `-` for stdin
    pub input: String,

    /// Schema file declaring the record types
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Ollama endpoint (overrides config)
    #[arg(long, env = "SIFT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model name (overrides config)
    #[arg(short, long, env = "SIFT_MODEL")]
    pub model: Option<String>,

    /// Start from a preset instead of the configured engine settings
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Maximum windows in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip the zero-yield fallback pass
    #[arg(long)]
    pub no_fallback: bool,
}

/// Arguments for the windows command.
#[derive(Debug, Parser)]
pub struct WindowsArgs {
    /// Document to read, or `-` for stdin
    pub input: String,

    /// Window size in characters
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Characters shared by consecutive windows
    #[arg(long)]
    pub overlap: Option<usize>,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Print a preset instead of the loaded configuration
    #[arg(short, long, value_enum)]
    pub preset: Option<PresetArg>,
}

/// Engine presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PresetArg {
    /// Balanced defaults
    Default,
    /// Smaller windows, shorter deadlines
    Aggressive,
    /// Larger windows, longer deadlines
    Lenient,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<PresetArg> for ExtractionConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => ExtractionConfig::default(),
            PresetArg::Aggressive => ExtractionConfig::aggressive(),
            PresetArg::Lenient => ExtractionConfig::lenient(),
        }
    }
}
