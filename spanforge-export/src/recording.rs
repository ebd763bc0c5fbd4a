//! Recording exporter that captures spans for verification in tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use spanforge_core::SpanRecord;

use crate::exporter::{ExportError, SpanExporter};

/// Mode for simulating export failures.
#[derive(Debug, Clone, Default)]
pub enum FailureMode {
    /// Never fail.
    #[default]
    None,
    /// Fail every N-th export.
    EveryN(usize),
    /// Fail the first N exports.
    FirstN(usize),
    /// Fail with probability p (0.0 to 1.0).
    Probabilistic(f64),
    /// Always fail.
    Always,
}

/// An exporter that records every span it is handed.
///
/// Useful for asserting what the engine emitted without a collector, and
/// for driving the engine's export-failure path.
pub struct RecordingSpanExporter {
    spans: Mutex<Vec<SpanRecord>>,
    export_count: AtomicUsize,
    failure_mode: FailureMode,
}

impl RecordingSpanExporter {
    pub fn new() -> Self {
        Self {
            spans: Mutex::new(Vec::new()),
            export_count: AtomicUsize::new(0),
            failure_mode: FailureMode::None,
        }
    }

    /// Set the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// All spans exported so far, in handoff order.
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().clone()
    }

    /// Number of export attempts, including failed ones.
    pub fn export_count(&self) -> usize {
        self.export_count.load(Ordering::SeqCst)
    }

    /// The most recently exported span, if any.
    pub fn last_span(&self) -> Option<SpanRecord> {
        self.spans.lock().last().cloned()
    }

    /// Drop all captured spans and reset counters.
    pub fn clear(&self) {
        self.spans.lock().clear();
        self.export_count.store(0, Ordering::SeqCst);
    }

    /// Assert that exactly `n` spans were captured.
    ///
    /// # Panics
    ///
    /// Panics if the captured count differs.
    pub fn assert_exported(&self, n: usize) {
        let count = self.spans.lock().len();
        assert_eq!(count, n, "expected {n} exported span(s), got {count}");
    }

    fn should_fail(&self, attempt: usize) -> bool {
        match &self.failure_mode {
            FailureMode::None => false,
            FailureMode::EveryN(n) => *n != 0 && attempt % n == 0,
            FailureMode::FirstN(n) => attempt <= *n,
            FailureMode::Probabilistic(p) => rand::random::<f64>() < *p,
            FailureMode::Always => true,
        }
    }
}

impl Default for RecordingSpanExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpanExporter for RecordingSpanExporter {
    fn name(&self) -> &str {
        "recording"
    }

    async fn export(&self, span: SpanRecord) -> Result<(), ExportError> {
        let attempt = self.export_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_fail(attempt) {
            return Err(ExportError::Rejected(format!(
                "simulated failure on export #{attempt}"
            )));
        }
        self.spans.lock().push(span);
        Ok(())
    }
}
