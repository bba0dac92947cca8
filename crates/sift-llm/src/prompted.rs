//! Adapt a text-generation provider into the completion capability

use crate::parser::parse_completion_response;
use crate::LlmProvider;
use async_trait::async_trait;
use sift_domain::{CapabilityError, Completion, CompletionRequest, RawExtraction};
use tracing::debug;

/// [`Completion`] backed by an [`LlmProvider`]
///
/// Sends the request's rendered prompt, parses the JSON answer, and caps the
/// result at `max_items` (one item when `many` is false). Provider errors are
/// classified by [`LlmError::is_transient`](crate::LlmError::is_transient).
///
/// # Examples
///
/// ```
/// use sift_domain::{Completion, CompletionRequest};
/// use sift_llm::{MockProvider, PromptedCompletion};
///
/// # tokio_test::block_on(async {
/// let provider = MockProvider::new(r#"[{"record_type": "allergy", "substance": "latex"}]"#);
/// let completion = PromptedCompletion::new(provider);
///
/// let request = CompletionRequest {
///     window_index: 0,
///     is_fallback: false,
///     prompt: "extract".to_string(),
///     window_text: "latex allergy".to_string(),
///     schemas: Vec::new(),
///     many: true,
///     max_items: 10,
/// };
/// let records = completion.complete(request).await.unwrap();
/// assert_eq!(records[0].record_type, "allergy");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct PromptedCompletion<P> {
    provider: P,
}

impl<P: LlmProvider> PromptedCompletion<P> {
    /// Wrap a provider
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: LlmProvider> Completion for PromptedCompletion<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<RawExtraction>, CapabilityError> {
        debug!(
            window = request.window_index,
            fallback = request.is_fallback,
            model = self.provider.model_name(),
            prompt_len = request.prompt.len(),
            "Requesting completion"
        );

        let response = self.provider.generate(&request.prompt).await?;
        let mut records = parse_completion_response(&response)?;

        let limit = if request.many { request.max_items } else { 1 };
        records.truncate(limit);
        Ok(records)
    }
}
