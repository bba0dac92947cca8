//! Sift CLI - Command-line interface for windowed, cited record extraction.

use clap::Parser;
use sift_cli::commands;
use sift_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let formatter = Formatter::new(sift_cli::OutputFormat::Table, true);
        eprintln!("{}", formatter.error(&e.to_string()));
        std::process::exit(1);
    }
}

/// Log to stderr so stdout carries only results; RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(cli: Cli) -> sift_cli::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await,
        Command::Windows(args) => commands::execute_windows(args, &config, &formatter).await,
        Command::Config(args) => commands::execute_config(args, &config, &formatter).await,
    }
}
