//! Metrics collection for extraction runs

use crate::error::WindowFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Pipeline stages timed by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Splitting the document into windows
    Windowing,
    /// Running the ordinary windows
    Dispatch,
    /// The zero-yield fallback pass
    Fallback,
    /// Deduplication and grouping
    Aggregation,
}

impl Stage {
    /// Key used in `stage_durations_ms`
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Windowing => "windowing",
            Stage::Dispatch => "dispatch",
            Stage::Fallback => "fallback",
            Stage::Aggregation => "aggregation",
        }
    }
}

/// Serializable report of one extraction run
///
/// Mutable while the run is in progress; read-only once finalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSessionMetrics {
    /// Unique run identifier (UUIDv7)
    pub session_id: String,

    /// Wall-clock duration of the run
    pub total_duration_ms: u64,

    /// Duration per pipeline stage
    pub stage_durations_ms: BTreeMap<String, u64>,

    /// Windows dispatched, fallback included
    pub windows_total: usize,
    /// Windows that ended `Succeeded`
    pub windows_succeeded: usize,
    /// Windows that ended `TimedOut` (per-window deadline or cancellation)
    pub windows_timed_out: usize,
    /// Windows that ended `Failed`
    pub windows_failed: usize,

    /// Retry attempts consumed across all windows
    pub retries_used: usize,
    /// Windows that failed on a transient error after exhausting retries
    pub transient_failures: usize,
    /// Windows that failed on a permanent error
    pub permanent_failures: usize,
    /// Windows whose retry budget ran out (transient or timeout)
    pub retry_exhausted: usize,
    /// Windows lost to a deadline
    pub timeout_failures: usize,
    /// Raw records rejected by schema validation
    pub validation_failures: usize,

    /// Raw records received from the capability
    pub raw_records_seen: usize,
    /// Validated records dropped as duplicates
    pub duplicates_removed: usize,
    /// Final records with a citation
    pub citations_found: usize,
    /// Final records without a citation
    pub uncited_records: usize,

    /// Final record count per type
    pub records_by_type: BTreeMap<String, usize>,
    /// Sum of `records_by_type`
    pub total_records_extracted: usize,

    /// Number of zero-yield fallback passes (0 or 1)
    pub zero_yield_fallbacks_used: usize,
    /// Highest number of windows in flight at once
    pub concurrency_high_water: usize,
    /// Whether the total deadline fired
    pub deadline_exceeded: bool,
    /// `windows_succeeded / windows_total`, 1.0 when no window ran
    pub success_rate: f64,
}

impl ExtractionSessionMetrics {
    /// Render the report as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Extraction Metrics Summary".to_string(),
            "==========================".to_string(),
            format!("Session: {}", self.session_id),
            format!("Total duration: {}ms", self.total_duration_ms),
            format!(
                "Windows: {} total, {} succeeded, {} timed out, {} failed ({:.0}% success)",
                self.windows_total,
                self.windows_succeeded,
                self.windows_timed_out,
                self.windows_failed,
                self.success_rate * 100.0
            ),
            format!(
                "Retries: {} used, {} exhausted",
                self.retries_used, self.retry_exhausted
            ),
            format!(
                "Failures: {} transient, {} permanent, {} timeout, {} validation",
                self.transient_failures,
                self.permanent_failures,
                self.timeout_failures,
                self.validation_failures
            ),
            format!(
                "Records: {} extracted from {} raw ({} duplicates removed)",
                self.total_records_extracted, self.raw_records_seen, self.duplicates_removed
            ),
            format!(
                "Citations: {} found, {} uncited",
                self.citations_found, self.uncited_records
            ),
            format!("Peak concurrency: {}", self.concurrency_high_water),
        ];

        if self.zero_yield_fallbacks_used > 0 {
            lines.push("Zero-yield fallback: used".to_string());
        }
        if self.deadline_exceeded {
            lines.push("Total deadline: exceeded".to_string());
        }

        if !self.stage_durations_ms.is_empty() {
            lines.push(String::new());
            lines.push("Stages:".to_string());
            for (stage, ms) in &self.stage_durations_ms {
                lines.push(format!("  {}: {}ms", stage, ms));
            }
        }

        if !self.records_by_type.is_empty() {
            lines.push(String::new());
            lines.push("Records by type:".to_string());
            for (record_type, count) in &self.records_by_type {
                lines.push(format!("  {}: {}", record_type, count));
            }
        }

        lines.join("\n")
    }
}

/// Accumulates metrics for one run
///
/// Owned by the runner task; nothing else mutates it.
#[derive(Debug)]
pub struct MetricsTracker {
    metrics: ExtractionSessionMetrics,
    started: Instant,
    timing: bool,
}

impl MetricsTracker {
    /// Start the run clock
    ///
    /// With `timing` off, stage durations are not recorded.
    pub fn start(timing: bool) -> Self {
        Self {
            metrics: ExtractionSessionMetrics {
                session_id: Uuid::now_v7().to_string(),
                ..Default::default()
            },
            started: Instant::now(),
            timing,
        }
    }

    /// Session identifier
    pub fn session_id(&self) -> &str {
        &self.metrics.session_id
    }

    /// Record how long a stage took
    pub fn record_stage(&mut self, stage: Stage, elapsed: Duration) {
        if self.timing {
            *self
                .metrics
                .stage_durations_ms
                .entry(stage.as_str().to_string())
                .or_insert(0) += elapsed.as_millis() as u64;
        }
    }

    /// Record a window that returned records
    pub fn record_succeeded(&mut self, retries: u32, records: usize) {
        self.metrics.windows_total += 1;
        self.metrics.windows_succeeded += 1;
        self.metrics.retries_used += retries as usize;
        self.metrics.raw_records_seen += records;
    }

    /// Record a window that hit a deadline
    ///
    /// `retries_exhausted` is true when the per-window deadline fired on the
    /// final permitted attempt.
    pub fn record_timed_out(&mut self, retries: u32, retries_exhausted: bool) {
        self.metrics.windows_total += 1;
        self.metrics.windows_timed_out += 1;
        self.metrics.timeout_failures += 1;
        self.metrics.retries_used += retries as usize;
        if retries_exhausted {
            self.metrics.retry_exhausted += 1;
        }
    }

    /// Record a window that failed
    pub fn record_failed(&mut self, retries: u32, failure: &WindowFailure) {
        self.metrics.windows_total += 1;
        self.metrics.windows_failed += 1;
        self.metrics.retries_used += retries as usize;
        match failure {
            WindowFailure::Transient(_) => {
                self.metrics.transient_failures += 1;
                self.metrics.retry_exhausted += 1;
            }
            WindowFailure::Permanent(_) | WindowFailure::Panicked(_) => {
                self.metrics.permanent_failures += 1;
            }
            WindowFailure::TimedOut | WindowFailure::Cancelled => {
                self.metrics.timeout_failures += 1;
            }
        }
    }

    /// Record a raw record rejected by schema validation
    pub fn record_validation_failure(&mut self) {
        self.metrics.validation_failures += 1;
    }

    /// Record the zero-yield fallback pass
    pub fn record_fallback(&mut self) {
        self.metrics.zero_yield_fallbacks_used += 1;
    }

    /// Record that the total deadline fired
    pub fn record_deadline_exceeded(&mut self) {
        self.metrics.deadline_exceeded = true;
    }

    /// Raise the concurrency high-water mark
    pub fn observe_concurrency(&mut self, in_flight: usize) {
        self.metrics.concurrency_high_water = self.metrics.concurrency_high_water.max(in_flight);
    }

    /// Record aggregation outcomes
    pub fn record_aggregation(&mut self, duplicates_removed: usize, citations_found: usize, uncited: usize) {
        self.metrics.duplicates_removed += duplicates_removed;
        self.metrics.citations_found += citations_found;
        self.metrics.uncited_records += uncited;
    }

    /// Current view of the counters
    pub fn snapshot(&self) -> &ExtractionSessionMetrics {
        &self.metrics
    }

    /// Compute derived totals and return the read-only report
    ///
    /// `total_records_extracted` is always the sum of `records_by_type`.
    pub fn finalize(mut self, records_by_type: BTreeMap<String, usize>) -> ExtractionSessionMetrics {
        self.metrics.total_records_extracted = records_by_type.values().sum();
        self.metrics.records_by_type = records_by_type;
        self.metrics.success_rate = if self.metrics.windows_total == 0 {
            1.0
        } else {
            self.metrics.windows_succeeded as f64 / self.metrics.windows_total as f64
        };
        self.metrics.total_duration_ms = self.started.elapsed().as_millis() as u64;
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_creation() {
        let tracker = MetricsTracker::start(true);
        let id = Uuid::parse_str(tracker.session_id()).unwrap();
        assert_eq!(id.get_version_num(), 7);

        let metrics = tracker.finalize(BTreeMap::new());
        assert_eq!(metrics.windows_total, 0);
        assert_eq!(metrics.success_rate, 1.0);
        assert_eq!(metrics.total_records_extracted, 0);
    }

    #[test]
    fn test_window_outcomes() {
        let mut tracker = MetricsTracker::start(true);
        tracker.record_succeeded(2, 5);
        tracker.record_timed_out(2, true);
        tracker.record_timed_out(0, false);
        tracker.record_failed(2, &WindowFailure::Transient("429".into()));
        tracker.record_failed(0, &WindowFailure::Permanent("400".into()));

        let metrics = tracker.finalize(BTreeMap::new());
        assert_eq!(metrics.windows_total, 5);
        assert_eq!(metrics.windows_succeeded, 1);
        assert_eq!(metrics.windows_timed_out, 2);
        assert_eq!(metrics.windows_failed, 2);
        assert_eq!(metrics.retries_used, 6);
        assert_eq!(metrics.retry_exhausted, 2);
        assert_eq!(metrics.transient_failures, 1);
        assert_eq!(metrics.permanent_failures, 1);
        assert_eq!(metrics.timeout_failures, 2);
        assert_eq!(metrics.raw_records_seen, 5);
        assert!((metrics.success_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_finalize_totals_match_records_by_type() {
        let mut by_type = BTreeMap::new();
        by_type.insert("allergy".to_string(), 2);
        by_type.insert("medication".to_string(), 3);

        let metrics = MetricsTracker::start(false).finalize(by_type);
        assert_eq!(metrics.total_records_extracted, 5);
        assert_eq!(metrics.records_by_type.values().sum::<usize>(), metrics.total_records_extracted);
    }

    #[test]
    fn test_stage_timing_respects_switch() {
        let mut on = MetricsTracker::start(true);
        on.record_stage(Stage::Dispatch, Duration::from_millis(40));
        on.record_stage(Stage::Dispatch, Duration::from_millis(2));
        assert_eq!(on.snapshot().stage_durations_ms["dispatch"], 42);

        let mut off = MetricsTracker::start(false);
        off.record_stage(Stage::Dispatch, Duration::from_millis(40));
        assert!(off.snapshot().stage_durations_ms.is_empty());
    }

    #[test]
    fn test_concurrency_high_water() {
        let mut tracker = MetricsTracker::start(true);
        tracker.observe_concurrency(2);
        tracker.observe_concurrency(3);
        tracker.observe_concurrency(1);
        assert_eq!(tracker.snapshot().concurrency_high_water, 3);
    }

    #[test]
    fn test_summary_and_json() {
        let mut tracker = MetricsTracker::start(true);
        tracker.record_succeeded(0, 1);
        tracker.record_fallback();
        tracker.record_validation_failure();
        tracker.record_aggregation(0, 1, 0);

        let mut by_type = BTreeMap::new();
        by_type.insert("condition".to_string(), 1);
        let metrics = tracker.finalize(by_type);

        let summary = metrics.summary();
        assert!(summary.contains("Windows: 1 total, 1 succeeded"));
        assert!(summary.contains("Zero-yield fallback: used"));
        assert!(summary.contains("condition: 1"));
        assert!(summary.contains("1 validation"));

        let parsed: ExtractionSessionMetrics = serde_json::from_str(&metrics.to_json().unwrap()).unwrap();
        assert_eq!(parsed, metrics);
    }
}
