//! WindowExecutor: one window through the completion capability
//!
//! Each attempt runs under the per-window deadline. Transient errors and
//! attempt timeouts are retried with exponential backoff until the retry
//! budget is spent; permanent errors end the window immediately.

use crate::config::ExtractionConfig;
use crate::error::WindowFailure;
use crate::prompt::PromptBuilder;
use sift_domain::{Completion, CompletionRequest, RawExtraction, SchemaSet, Window};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Terminal state of one window
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    /// The capability answered; the record list may be empty
    Succeeded {
        /// Raw records, in emission order
        records: Vec<RawExtraction>,
        /// Retry attempts consumed
        retries: u32,
    },

    /// A deadline ended the window
    TimedOut {
        /// `TimedOut` for the per-window deadline, `Cancelled` for the run deadline
        failure: WindowFailure,
        /// Retry attempts consumed
        retries: u32,
    },

    /// The capability failed
    Failed {
        /// Classified failure
        error: WindowFailure,
        /// Retry attempts consumed
        retries: u32,
    },
}

impl WindowOutcome {
    /// Retry attempts consumed
    pub fn retries(&self) -> u32 {
        match self {
            WindowOutcome::Succeeded { retries, .. }
            | WindowOutcome::TimedOut { retries, .. }
            | WindowOutcome::Failed { retries, .. } => *retries,
        }
    }

    /// True for `Succeeded`
    pub fn is_success(&self) -> bool {
        matches!(self, WindowOutcome::Succeeded { .. })
    }

    /// A window cancelled by the run deadline
    pub fn cancelled() -> Self {
        WindowOutcome::TimedOut {
            failure: WindowFailure::Cancelled,
            retries: 0,
        }
    }
}

/// Runs single windows against the capability
///
/// Cheap to clone; one clone is moved into each window task.
#[derive(Clone)]
pub struct WindowExecutor {
    capability: Arc<dyn Completion>,
    schemas: Arc<SchemaSet>,
    window_timeout: Duration,
    max_retries: u32,
    config: Arc<ExtractionConfig>,
}

impl WindowExecutor {
    /// Create an executor with the configured deadline and retry budget
    pub fn new(capability: Arc<dyn Completion>, schemas: Arc<SchemaSet>, config: Arc<ExtractionConfig>) -> Self {
        Self {
            capability,
            schemas,
            window_timeout: config.window_timeout(),
            max_retries: config.max_retries,
            config,
        }
    }

    /// The same executor with retries disabled
    pub fn without_retries(mut self) -> Self {
        self.max_retries = 0;
        self
    }

    /// Retry budget in effect
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn request(&self, window: &Window, prompt: &str, is_fallback: bool) -> CompletionRequest {
        CompletionRequest {
            window_index: window.index,
            is_fallback,
            prompt: prompt.to_string(),
            window_text: window.text.clone(),
            schemas: self.schemas.descriptors(),
            many: true,
            max_items: self.config.max_items_per_window,
        }
    }

    /// Run `window` to a terminal outcome
    pub async fn run(&self, window: &Window, is_fallback: bool) -> WindowOutcome {
        let prompt = PromptBuilder::new(window.text.as_str())
            .with_schemas(&self.schemas, self.config.max_extractable_fields)
            .with_max_items(self.config.max_items_per_window)
            .fallback(is_fallback)
            .build();

        let mut retries = 0;
        loop {
            debug!(window = window.index, attempt = retries + 1, "Sending window");
            let request = self.request(window, &prompt, is_fallback);

            match timeout(self.window_timeout, self.capability.complete(request)).await {
                Ok(Ok(records)) => {
                    debug!(window = window.index, records = records.len(), retries, "Window succeeded");
                    return WindowOutcome::Succeeded { records, retries };
                }
                Ok(Err(e)) if e.is_transient() && retries < self.max_retries => {
                    warn!(window = window.index, attempt = retries + 1, "Transient failure, retrying: {}", e);
                }
                Ok(Err(e)) => {
                    warn!(window = window.index, retries, "Window failed: {}", e);
                    return WindowOutcome::Failed {
                        error: e.into(),
                        retries,
                    };
                }
                Err(_) if retries < self.max_retries => {
                    warn!(
                        window = window.index,
                        attempt = retries + 1,
                        timeout_secs = self.window_timeout.as_secs(),
                        "Attempt timed out, retrying"
                    );
                }
                Err(_) => {
                    warn!(window = window.index, retries, "Window timed out");
                    return WindowOutcome::TimedOut {
                        failure: WindowFailure::TimedOut,
                        retries,
                    };
                }
            }

            retries += 1;
            sleep(self.config.retry_backoff(retries)).await;
        }
    }
}
