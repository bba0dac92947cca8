//! Sift LLM Provider Layer
//!
//! Implementations of the [`Completion`](sift_domain::Completion) capability
//! consumed by the extraction engine.
//!
//! # Architecture
//!
//! ```text
//! CompletionRequest ─► PromptedCompletion ─► LlmProvider::generate ─► parser ─► RawExtraction*
//!                  └─► MockCompletion (scripted; tests)
//! ```
//!
//! # Providers
//!
//! - `MockProvider`: deterministic text provider for testing the prompt/parse path
//! - `OllamaProvider`: local Ollama API integration
//! - `MockCompletion`: scriptable completion double (latency, hangs, error classes)
//! - `PromptedCompletion`: adapts any `LlmProvider` into a `Completion`
//!
//! # Examples
//!
//! ```
//! use sift_llm::{LlmProvider, MockProvider};
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod ollama;
pub mod parser;
pub mod prompted;

use async_trait::async_trait;
use sift_domain::CapabilityError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use mock::{MockCall, MockCompletion, MockStep};
pub use ollama::OllamaProvider;
pub use parser::parse_completion_response;
pub use prompted::PromptedCompletion;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether a retry of the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_) | LlmError::InvalidResponse(_) | LlmError::RateLimitExceeded
        )
    }
}

impl From<LlmError> for CapabilityError {
    fn from(e: LlmError) -> Self {
        if e.is_transient() {
            CapabilityError::Transient(e.to_string())
        } else {
            CapabilityError::Permanent(e.to_string())
        }
    }
}

/// Text-generation backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str {
        "llm"
    }
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
///
/// # Examples
///
/// ```
/// use sift_llm::{LlmProvider, MockProvider};
///
/// # tokio_test::block_on(async {
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// assert_eq!(provider.generate("prompt1").await.unwrap(), "response1");
/// assert_eq!(provider.call_count(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, Result<String, LlmError>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(prompt.into(), Ok(response.into()));
    }

    /// Configure an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>, error: LlmError) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(prompt.into(), Err(error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("[]")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        *self.call_count.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        match responses.get(prompt) {
            Some(response) => response.clone(),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
