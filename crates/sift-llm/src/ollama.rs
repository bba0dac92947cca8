//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with Ollama API
//! - Configurable endpoint and model
//! - JSON output mode
//! - Request timeout
//!
//! Retries are not performed here; the extraction engine owns retry policy.
//!
//! # Examples
//!
//! ```no_run
//! use sift_llm::{OllamaProvider, PromptedCompletion};
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3").unwrap();
//! let completion = PromptedCompletion::new(provider);
//! ```

use crate::{LlmError, LlmProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Ollama API provider for local LLM inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3", "mistral")
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Other`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with an explicit HTTP timeout
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }

    /// Create a new Ollama provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    /// Generate text using Ollama API
    ///
    /// # Errors
    ///
    /// - [`LlmError::Communication`] when Ollama is unreachable or returns a server error
    /// - [`LlmError::ModelNotAvailable`] on HTTP 404
    /// - [`LlmError::RateLimitExceeded`] on HTTP 429
    /// - [`LlmError::InvalidResponse`] when the body is not a generate response
    /// - [`LlmError::Other`] for any other client error
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<OllamaGenerateResponse>()
                .await
                .map(|r| r.response)
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if status.is_server_error() {
            Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)))
        } else {
            Err(LlmError::Other(format!("HTTP {}: {}", status, error_text)))
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3").unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:11434");
        assert_eq!(provider.model_name(), "llama3");
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral").unwrap();
        assert_eq!(provider.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(provider.model_name(), "mistral");
    }

    #[test]
    fn test_request_body_uses_json_format() {
        let body = OllamaGenerateRequest {
            model: "llama3",
            prompt: "hi",
            stream: false,
            format: "json",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
    }

    // Integration tests (requires running Ollama)
    #[tokio::test]
    #[ignore]
    async fn test_ollama_generate_integration() {
        let provider = OllamaProvider::default_endpoint("llama3").unwrap();
        let result = provider.generate("Return an empty JSON array").await;
        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }

    #[tokio::test]
    async fn test_ollama_unreachable_is_transient() {
        // Port 9 (discard) is closed on test hosts
        let provider =
            OllamaProvider::with_timeout("http://127.0.0.1:9", "llama3", Duration::from_secs(2))
                .unwrap();

        let err = provider.generate("test").await.unwrap_err();
        assert!(matches!(err, LlmError::Communication(_)));
        assert!(err.is_transient());
    }
}
