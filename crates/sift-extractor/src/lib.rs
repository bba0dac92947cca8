//! Sift Extractor
//!
//! Extracts typed, cited records from long unstructured text by delegating
//! recognition to a language model, then verifying and aggregating results.
//!
//! # Overview
//!
//! Oversized documents are cut into overlapping windows. Windows run
//! concurrently through an injected [`Completion`](sift_domain::Completion)
//! capability under a per-window deadline with bounded retries, and the
//! whole run is bounded by a total deadline. Every returned record is
//! validated against its schema, anchored to a span of the source text,
//! deduplicated across overlapping windows and grouped by type.
//!
//! # Architecture
//!
//! ```text
//! Text → Windower → [WindowExecutor × concurrency_limit] → ResultAggregator → ExtractionResult
//!                          │                                      │
//!                          └──────────── MetricsTracker ◄─────────┘
//! ```
//!
//! If no window yields a record, a single zero-yield fallback pass runs over
//! the (truncated) document before the result is returned.
//!
//! # Key Features
//!
//! - **Windowing**: fixed-size character windows with configurable overlap
//! - **Deadlines**: per-attempt timeout, exponential-backoff retries, total run deadline
//! - **Citations**: exact, normalized and token-overlap span matching
//! - **Deduplication**: overlapping citations or equal payloads collapse to one record
//! - **Partial results**: failed windows are counted, never fatal
//!
//! # Example Usage
//!
//! ```no_run
//! use sift_domain::{FieldKind, FieldSpec, RecordSchema, SchemaSet};
//! use sift_extractor::{extract_document, ExtractionConfig};
//! use sift_llm::{OllamaProvider, PromptedCompletion};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schemas = SchemaSet::new().with(
//!     RecordSchema::new("medication")
//!         .with_field(FieldSpec::required("name", FieldKind::CodedConcept))
//!         .with_field(FieldSpec::optional("dose", FieldKind::Text)),
//! );
//! let capability = Arc::new(PromptedCompletion::new(OllamaProvider::default_endpoint("llama3")?));
//!
//! let text = std::fs::read_to_string("note.txt")?;
//! let result = extract_document(&text, &schemas, capability, &ExtractionConfig::default()).await?;
//!
//! println!("Extracted: {} records", result.total_records());
//! println!("{}", result.metrics.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod aggregator;
mod chunking;
mod citation;
mod config;
mod error;
mod executor;
mod metrics;
mod prompt;
mod runner;
mod types;


pub use aggregator::{AggregatedRecords, ResultAggregator, WindowAggregation, DUPLICATE_OVERLAP_RATIO};
pub use chunking::split;
pub use citation::{Citation, CitationMatcher, MatchStrategy};
pub use config::{
    ChunkStrategy, ChunkingPolicy, ExtractionConfig, MAX_CONCURRENCY_LIMIT, MAX_RETRY_BACKOFF_MS, MAX_TIMEOUT_SECS,
};
pub use error::{ExtractorError, WindowFailure};
pub use executor::{WindowExecutor, WindowOutcome};
pub use metrics::{ExtractionSessionMetrics, MetricsTracker, Stage};
pub use prompt::PromptBuilder;
pub use runner::{extract_document, ExtractionRunner};
pub use types::ExtractionResult;
