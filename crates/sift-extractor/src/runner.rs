//! ExtractionRunner: windowed, concurrent, deadline-bounded extraction

use crate::aggregator::ResultAggregator;
use crate::chunking::split;
use crate::citation::CitationMatcher;
use crate::config::ExtractionConfig;
use crate::error::{ExtractorError, WindowFailure};
use crate::executor::{WindowExecutor, WindowOutcome};
use crate::metrics::{MetricsTracker, Stage};
use crate::types::ExtractionResult;
use futures::FutureExt;
use sift_domain::{char_len, Completion, SchemaSet, Window};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Extract records from `text` with an injected completion capability
///
/// Convenience wrapper around [`ExtractionRunner`].
///
/// # Errors
///
/// Only configuration problems are errors: an invalid [`ExtractionConfig`]
/// or an empty schema set. Capability failures are absorbed into the
/// returned metrics.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sift_domain::{FieldKind, FieldSpec, RawExtraction, RecordSchema, SchemaSet};
/// use sift_extractor::{extract_document, ExtractionConfig};
/// use sift_llm::MockCompletion;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let schemas = SchemaSet::new().with(
///     RecordSchema::new("allergy").with_field(FieldSpec::required("substance", FieldKind::Text)),
/// );
/// let mock = MockCompletion::new(vec![RawExtraction::from_json(
///     "allergy",
///     json!({"substance": "latex"}),
///     "latex",
/// )]);
///
/// let text = "Reports a latex allergy.";
/// let result = extract_document(text, &schemas, Arc::new(mock), &ExtractionConfig::default())
///     .await
///     .unwrap();
///
/// assert_eq!(result.records("allergy").len(), 1);
/// assert_eq!(result.metrics.citations_found, 1);
/// # });
/// ```
pub async fn extract_document(
    text: &str,
    schemas: &SchemaSet,
    capability: Arc<dyn Completion>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractorError> {
    ExtractionRunner::new(capability, config.clone())
        .extract(text, schemas)
        .await
}

/// Orchestrates one extraction run per call
///
/// Windows run as tasks on a [`JoinSet`], bounded by a semaphore of
/// `concurrency_limit` permits. The calling task is the only consumer of
/// window outcomes, so the aggregator and metrics need no locking.
pub struct ExtractionRunner {
    capability: Arc<dyn Completion>,
    config: Arc<ExtractionConfig>,
}

impl ExtractionRunner {
    /// Create a runner
    pub fn new(capability: Arc<dyn Completion>, config: ExtractionConfig) -> Self {
        Self {
            capability,
            config: Arc::new(config),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run a full extraction over `text`
    pub async fn extract(&self, text: &str, schemas: &SchemaSet) -> Result<ExtractionResult, ExtractorError> {
        self.config.validate()?;
        if schemas.is_empty() {
            return Err(ExtractorError::EmptySchemaSet);
        }

        let deadline = Instant::now()
            .checked_add(self.config.total_timeout())
            .ok_or_else(|| ExtractorError::Config("total_timeout_secs is too large".to_string()))?;
        let mut tracker = MetricsTracker::start(self.config.enable_metrics);
        let text_len = char_len(text);
        info!(
            session = tracker.session_id(),
            chars = text_len,
            types = schemas.len(),
            "Starting extraction"
        );

        let stage = Instant::now();
        let windows = split(text, &self.config.chunking);
        tracker.record_stage(Stage::Windowing, stage.elapsed());
        debug!("Split text into {} windows", windows.len());

        let mut aggregator =
            ResultAggregator::new(schemas, CitationMatcher::new(self.config.citation_min_similarity));

        if text_len == 0 {
            // Nothing to send; the single empty window counts as an empty success
            tracker.record_succeeded(0, 0);
            return Ok(self.finish(aggregator, tracker));
        }

        let executor = WindowExecutor::new(
            Arc::clone(&self.capability),
            Arc::new(schemas.clone()),
            Arc::clone(&self.config),
        );
        let gauge = ConcurrencyGauge::default();

        let stage = Instant::now();
        self.dispatch(&windows, &executor, &gauge, deadline, &mut aggregator, &mut tracker)
            .await;
        tracker.record_stage(Stage::Dispatch, stage.elapsed());

        if aggregator.is_empty() && self.config.enable_zero_yield_fallback {
            if Instant::now() < deadline {
                let stage = Instant::now();
                self.fallback(text, windows.len(), executor, &gauge, deadline, &mut aggregator, &mut tracker)
                    .await;
                tracker.record_stage(Stage::Fallback, stage.elapsed());
            } else {
                debug!("Skipping zero-yield fallback: total deadline exhausted");
            }
        }

        tracker.observe_concurrency(gauge.peak());
        Ok(self.finish(aggregator, tracker))
    }

    /// Run every ordinary window until all settle or the deadline fires
    async fn dispatch(
        &self,
        windows: &[Window],
        executor: &WindowExecutor,
        gauge: &ConcurrencyGauge,
        deadline: Instant,
        aggregator: &mut ResultAggregator<'_>,
        tracker: &mut MetricsTracker,
    ) {
        let permits = self.config.concurrency_limit.min(windows.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut tasks = JoinSet::new();

        for window in windows.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            let executor = executor.clone();
            let gauge = gauge.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_guarded(&executor, &window, false, &gauge).await,
                    Err(_) => WindowOutcome::cancelled(),
                };
                (window.index, outcome)
            });
        }

        let mut settled = vec![false; windows.len()];
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => {
                    settled[index] = true;
                    absorb(&windows[index], outcome, aggregator, tracker);
                }
                Ok(Some(Err(e))) => {
                    warn!("Window task ended abnormally: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    let pending = settled.iter().filter(|done| !**done).count();
                    warn!(pending, "Total deadline exceeded; cancelling in-flight windows");
                    tracker.record_deadline_exceeded();
                    tasks.abort_all();
                    break;
                }
            }
        }

        for (window, _) in windows.iter().zip(&settled).filter(|(_, done)| !**done) {
            absorb(window, WindowOutcome::cancelled(), aggregator, tracker);
        }
    }

    /// The single whole-document pass after an empty run
    #[allow(clippy::too_many_arguments)]
    async fn fallback(
        &self,
        text: &str,
        index: usize,
        executor: WindowExecutor,
        gauge: &ConcurrencyGauge,
        deadline: Instant,
        aggregator: &mut ResultAggregator<'_>,
        tracker: &mut MetricsTracker,
    ) {
        let end = char_len(text).min(self.config.chunking.max_chars);
        let window = Window::from_source(index, text, 0, end);
        let so_far = tracker.snapshot();
        info!(
            window = index,
            chars = end,
            truncated = end < char_len(text),
            failed = so_far.windows_failed,
            timed_out = so_far.windows_timed_out,
            "No records extracted; running zero-yield fallback"
        );
        tracker.record_fallback();

        let executor = executor.without_retries();
        let outcome = match timeout_at(deadline, run_guarded(&executor, &window, true, gauge)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Total deadline exceeded during zero-yield fallback");
                tracker.record_deadline_exceeded();
                WindowOutcome::cancelled()
            }
        };
        absorb(&window, outcome, aggregator, tracker);
    }

    fn finish(&self, aggregator: ResultAggregator<'_>, mut tracker: MetricsTracker) -> ExtractionResult {
        let stage = Instant::now();
        let aggregated = aggregator.finish();
        tracker.record_aggregation(
            aggregated.duplicates_removed,
            aggregated.citations_found,
            aggregated.uncited,
        );
        tracker.record_stage(Stage::Aggregation, stage.elapsed());

        let counts: BTreeMap<String, usize> = aggregated
            .records_by_type
            .iter()
            .map(|(record_type, records)| (record_type.clone(), records.len()))
            .collect();
        let metrics = tracker.finalize(counts);

        info!(
            session = %metrics.session_id,
            records = metrics.total_records_extracted,
            windows = metrics.windows_total,
            failed = metrics.windows_failed + metrics.windows_timed_out,
            duration_ms = metrics.total_duration_ms,
            "Extraction complete"
        );
        if self.config.enable_metrics {
            info!("{}", metrics.summary());
        }

        ExtractionResult {
            records_by_type: aggregated.records_by_type,
            metrics,
        }
    }
}

/// Feed one window outcome into the aggregator and metrics
fn absorb(
    window: &Window,
    outcome: WindowOutcome,
    aggregator: &mut ResultAggregator<'_>,
    tracker: &mut MetricsTracker,
) {
    match outcome {
        WindowOutcome::Succeeded { records, retries } => {
            tracker.record_succeeded(retries, records.len());
            let result = aggregator.add_window(window, records);
            for _ in 0..result.rejected {
                tracker.record_validation_failure();
            }
        }
        WindowOutcome::TimedOut { failure, retries } => {
            debug!(window = window.index, "Window outcome: {}", failure);
            tracker.record_timed_out(retries, failure == WindowFailure::TimedOut);
        }
        WindowOutcome::Failed { error, retries } => {
            debug!(window = window.index, "Window outcome: {}", error);
            tracker.record_failed(retries, &error);
        }
    }
}

/// Run a window, converting a panic into a failed outcome
async fn run_guarded(
    executor: &WindowExecutor,
    window: &Window,
    is_fallback: bool,
    gauge: &ConcurrencyGauge,
) -> WindowOutcome {
    let _slot = gauge.enter();
    AssertUnwindSafe(executor.run(window, is_fallback))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            warn!(window = window.index, "Window task panicked: {}", message);
            WindowOutcome::Failed {
                error: WindowFailure::Panicked(message),
                retries: 0,
            }
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Counts windows currently calling the capability and remembers the peak
#[derive(Debug, Clone, Default)]
struct ConcurrencyGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    fn enter(&self) -> GaugeSlot {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeSlot(Arc::clone(&self.current))
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeSlot(Arc<AtomicUsize>);

impl Drop for GaugeSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
