//! Trait definitions for external interactions
//!
//! The engine consumes exactly one capability: a model completion that turns a
//! prompt scoped to one window into raw records. Implementations live in
//! other crates (sift-llm) or in test doubles.

use crate::record::RawExtraction;
use crate::schema::TypeDescriptor;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure classes reported by a completion capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Retryable infrastructure failure (network, rate limit, garbled output)
    #[error("Transient capability error: {0}")]
    Transient(String),

    /// Non-retryable failure (malformed request, unknown model)
    #[error("Permanent capability error: {0}")]
    Permanent(String),
}

impl CapabilityError {
    /// Whether the executor may retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, CapabilityError::Transient(_))
    }
}

/// One completion call, scoped to a single window
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Index of the window being extracted
    pub window_index: usize,

    /// True for the single whole-document zero-yield pass
    pub is_fallback: bool,

    /// Fully rendered prompt
    pub prompt: String,

    /// The window text the prompt was built around
    pub window_text: String,

    /// Record types the model may return
    pub schemas: Vec<Arc<dyn TypeDescriptor>>,

    /// Whether more than one record may be returned
    pub many: bool,

    /// Upper bound on returned records
    pub max_items: usize,
}

/// The language-model capability consumed by the engine
///
/// Injected by the caller; never resolved from global state.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Run one completion and return the raw records it produced
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<RawExtraction>, CapabilityError>;
}

#[async_trait]
impl<T: Completion + ?Sized> Completion for Arc<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<RawExtraction>, CapabilityError> {
        (**self).complete(request).await
    }
}
