//! Scriptable completion double
//!
//! `MockCompletion` answers [`CompletionRequest`]s from per-window scripts so
//! tests can simulate latency, hung calls, and both capability error classes
//! without a model.

use async_trait::async_trait;
use sift_domain::{CapabilityError, Completion, CompletionRequest, RawExtraction};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reaction to a completion call
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Return these records
    Respond(Vec<RawExtraction>),
    /// Sleep, then perform the inner step
    Delay(Duration, Box<MockStep>),
    /// Never complete (the caller's deadline must fire)
    Hang,
    /// Fail with a transient error
    Transient(String),
    /// Fail with a permanent error
    Permanent(String),
}

impl MockStep {
    /// Return no records
    pub fn empty() -> Self {
        MockStep::Respond(Vec::new())
    }

    /// Delay this step by `duration`
    pub fn after(self, duration: Duration) -> Self {
        MockStep::Delay(duration, Box::new(self))
    }
}

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Window index from the request
    pub window_index: usize,
    /// Whether the request was the zero-yield fallback
    pub is_fallback: bool,
    /// Length of the window text in bytes
    pub window_text_len: usize,
}

#[derive(Debug)]
struct MockState {
    default_step: MockStep,
    scripts: HashMap<usize, VecDeque<MockStep>>,
    fallback: VecDeque<MockStep>,
    calls: Vec<MockCall>,
}

/// Scriptable [`Completion`] for tests
///
/// Each window index has its own queue of steps; once a queue is exhausted
/// the default step is used. The fallback pass has a separate queue.
/// Clones share state.
///
/// # Examples
///
/// ```
/// use sift_llm::{MockCompletion, MockStep};
/// use std::time::Duration;
///
/// let mock = MockCompletion::empty()
///     .script(0, vec![MockStep::Transient("429".into()), MockStep::empty()])
///     .script(1, vec![MockStep::Hang])
///     .script(2, vec![MockStep::empty().after(Duration::from_millis(50))]);
/// assert_eq!(mock.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockCompletion {
    state: Arc<Mutex<MockState>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockCompletion {
    /// A mock whose default step returns `records` for every window
    pub fn new(records: Vec<RawExtraction>) -> Self {
        Self::with_default(MockStep::Respond(records))
    }

    /// A mock that returns no records unless scripted
    pub fn empty() -> Self {
        Self::with_default(MockStep::empty())
    }

    /// A mock with an arbitrary default step
    pub fn with_default(step: MockStep) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                default_step: step,
                scripts: HashMap::new(),
                fallback: VecDeque::new(),
                calls: Vec::new(),
            })),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue steps for a window index
    pub fn script(self, window_index: usize, steps: Vec<MockStep>) -> Self {
        self.lock().scripts.entry(window_index).or_default().extend(steps);
        self
    }

    /// Queue steps for the zero-yield fallback pass
    pub fn script_fallback(self, steps: Vec<MockStep>) -> Self {
        self.lock().fallback.extend(steps);
        self
    }

    /// Total calls observed
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Calls observed for one window index (ordinary windows only)
    pub fn calls_for(&self, window_index: usize) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.window_index == window_index && !c.is_fallback)
            .count()
    }

    /// Calls issued for the fallback pass
    pub fn fallback_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_fallback).count()
    }

    /// All observed calls in arrival order
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Highest number of calls that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_step(&self, request: &CompletionRequest) -> MockStep {
        let mut state = self.lock();
        state.calls.push(MockCall {
            window_index: request.window_index,
            is_fallback: request.is_fallback,
            window_text_len: request.window_text.len(),
        });

        let scripted = if request.is_fallback {
            state.fallback.pop_front()
        } else {
            state
                .scripts
                .get_mut(&request.window_index)
                .and_then(|queue| queue.pop_front())
        };
        scripted.unwrap_or_else(|| state.default_step.clone())
    }
}

/// Decrements the in-flight gauge even when the call is cancelled mid-flight
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Completion for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<RawExtraction>, CapabilityError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let mut step = self.next_step(&request);
        loop {
            match step {
                MockStep::Delay(duration, next) => {
                    tokio::time::sleep(duration).await;
                    step = *next;
                }
                MockStep::Hang => std::future::pending::<()>().await,
                MockStep::Respond(mut records) => {
                    records.truncate(request.max_items);
                    return Ok(records);
                }
                MockStep::Transient(msg) => return Err(CapabilityError::Transient(msg)),
                MockStep::Permanent(msg) => return Err(CapabilityError::Permanent(msg)),
            }
        }
    }
}
