//! Configuration for the extraction engine

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on a single retry backoff sleep
pub const MAX_RETRY_BACKOFF_MS: u64 = 5_000;

/// Largest accepted `concurrency_limit`
pub const MAX_CONCURRENCY_LIMIT: usize = 256;

/// Largest accepted `total_timeout_secs` (one week)
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Window splitting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Fixed-size character windows with overlap
    CharCount,
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        ChunkStrategy::CharCount
    }
}

/// How a document is cut into windows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingPolicy {
    /// Splitting strategy
    pub strategy: ChunkStrategy,

    /// Window size in characters
    pub max_chars: usize,

    /// Characters shared by consecutive windows; must be below `max_chars`
    pub chunk_overlap: usize,
}

impl ChunkingPolicy {
    /// Character-count policy with the given size and overlap
    pub fn char_count(max_chars: usize, chunk_overlap: usize) -> Self {
        Self {
            strategy: ChunkStrategy::CharCount,
            max_chars,
            chunk_overlap,
        }
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.max_chars == 0 {
            return Err(ExtractorError::Config("max_chars must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.max_chars {
            return Err(ExtractorError::Config(format!(
                "chunk_overlap ({}) must be less than max_chars ({})",
                self.chunk_overlap, self.max_chars
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self::char_count(4_000, 200)
    }
}

/// Configuration for an extraction run
///
/// Every field has a default, so a partial TOML document is accepted:
///
/// ```
/// use sift_extractor::ExtractionConfig;
///
/// let config = ExtractionConfig::from_toml("concurrency_limit = 8\n[chunking]\nmax_chars = 2000\n").unwrap();
/// assert_eq!(config.concurrency_limit, 8);
/// assert_eq!(config.chunking.max_chars, 2000);
/// assert_eq!(config.chunking.chunk_overlap, 200);
/// assert_eq!(config.max_retries, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum simultaneous window executions
    pub concurrency_limit: usize,

    /// Deadline for a single completion attempt (seconds)
    pub window_timeout_secs: u64,

    /// Deadline for the whole run, fallback included (seconds)
    pub total_timeout_secs: u64,

    /// Retries per window after a transient failure or attempt timeout
    pub max_retries: u32,

    /// Base delay before the first retry; doubles per attempt (milliseconds)
    pub retry_backoff_ms: u64,

    /// Run one whole-document pass when every window yields nothing
    pub enable_zero_yield_fallback: bool,

    /// Cap on fields described per record type in the prompt
    pub max_extractable_fields: usize,

    /// Cap on records requested per window
    pub max_items_per_window: usize,

    /// Minimum token-overlap score accepted as a citation, in (0, 1]
    pub citation_min_similarity: f64,

    /// Record stage timings and log the metrics summary
    pub enable_metrics: bool,

    /// Window splitting policy
    pub chunking: ChunkingPolicy,
}

impl ExtractionConfig {
    /// Per-attempt deadline as a Duration
    pub fn window_timeout(&self) -> Duration {
        Duration::from_secs(self.window_timeout_secs)
    }

    /// Whole-run deadline as a Duration
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }

    /// Backoff before retry number `retry` (1-based), capped at five seconds
    pub fn retry_backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.retry_backoff_ms.saturating_mul(factor);
        Duration::from_millis(ms.min(MAX_RETRY_BACKOFF_MS))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        self.chunking.validate()?;

        if self.concurrency_limit == 0 {
            return Err(ExtractorError::Config(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }
        if self.concurrency_limit > MAX_CONCURRENCY_LIMIT {
            return Err(ExtractorError::Config(format!(
                "concurrency_limit ({}) cannot exceed {}",
                self.concurrency_limit, MAX_CONCURRENCY_LIMIT
            )));
        }
        if self.window_timeout_secs == 0 {
            return Err(ExtractorError::Config(
                "window_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.total_timeout_secs == 0 {
            return Err(ExtractorError::Config(
                "total_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.total_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ExtractorError::Config(format!(
                "total_timeout_secs ({}) cannot exceed {}",
                self.total_timeout_secs, MAX_TIMEOUT_SECS
            )));
        }
        if self.window_timeout_secs > self.total_timeout_secs {
            return Err(ExtractorError::Config(
                "window_timeout_secs cannot exceed total_timeout_secs".to_string(),
            ));
        }
        if self.max_extractable_fields == 0 {
            return Err(ExtractorError::Config(
                "max_extractable_fields must be greater than 0".to_string(),
            ));
        }
        if self.max_items_per_window == 0 {
            return Err(ExtractorError::Config(
                "max_items_per_window must be greater than 0".to_string(),
            ));
        }
        if !(self.citation_min_similarity > 0.0 && self.citation_min_similarity <= 1.0) {
            return Err(ExtractorError::Config(format!(
                "citation_min_similarity must be in (0, 1], got {}",
                self.citation_min_similarity
            )));
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            window_timeout_secs: 30,
            total_timeout_secs: 300,
            max_retries: 2,
            retry_backoff_ms: 250,
            enable_zero_yield_fallback: true,
            max_extractable_fields: 25,
            max_items_per_window: 50,
            citation_min_similarity: 0.6,
            enable_metrics: true,
            chunking: ChunkingPolicy::default(),
        }
    }
}

impl ExtractionConfig {
    /// Aggressive preset: smaller windows and shorter deadlines for faster runs
    pub fn aggressive() -> Self {
        Self {
            chunking: ChunkingPolicy::char_count(2_000, 100),
            concurrency_limit: 6,
            window_timeout_secs: 15,
            total_timeout_secs: 120,
            max_retries: 1,
            retry_backoff_ms: 100,
            ..Self::default()
        }
    }

    /// Lenient preset: larger windows and longer deadlines for slow models
    pub fn lenient() -> Self {
        Self {
            chunking: ChunkingPolicy::char_count(8_000, 400),
            concurrency_limit: 2,
            window_timeout_secs: 90,
            total_timeout_secs: 900,
            max_retries: 3,
            retry_backoff_ms: 500,
            citation_min_similarity: 0.5,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
