//! Error types for the extraction engine

use sift_domain::CapabilityError;
use thiserror::Error;

/// Errors that fail an extraction call before any window is dispatched
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No record types were registered
    #[error("Schema set is empty")]
    EmptySchemaSet,
}

/// Why a window ended without records
///
/// Absorbed by the runner and counted in metrics; never returned to callers
/// of `extract_document`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowFailure {
    /// Transient capability error that outlived the retry budget
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Non-retryable capability error
    #[error("Permanent failure: {0}")]
    Permanent(String),

    /// The final attempt hit the per-window deadline
    #[error("Window timed out")]
    TimedOut,

    /// The run's total deadline cancelled the window
    #[error("Cancelled by total deadline")]
    Cancelled,

    /// The window task panicked
    #[error("Window task panicked: {0}")]
    Panicked(String),
}

impl From<CapabilityError> for WindowFailure {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::Transient(msg) => WindowFailure::Transient(msg),
            CapabilityError::Permanent(msg) => WindowFailure::Permanent(msg),
        }
    }
}
